use serde::{Deserialize, Serialize};

/// Upper bound for each buff counter
pub const MAX_BUFF: u32 = 9_999;

/// Upper bound for a member's power rating
pub const MAX_POWER: u32 = 99_999;

/// Clamp a raw numeric input into `0..=max`.
///
/// Inputs are taken as `f64` so that whatever shape a client manages to send
/// collapses into a storable integer: non-finite values become 0, negatives
/// become 0, anything above `max` becomes `max`.
pub fn clamp_int(value: f64, max: u32) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    let n = value.trunc();
    if n < 0.0 {
        0
    } else if n > max as f64 {
        max
    } else {
        n as u32
    }
}

/// Shared party-wide buff counters, writable by the owner only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buffs {
    pub attack: u32,
    pub defense: u32,
    pub luck: u32,
}

/// Partial buff update; omitted fields keep their current value
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BuffsPatch {
    pub attack: Option<f64>,
    pub defense: Option<f64>,
    pub luck: Option<f64>,
}

impl Buffs {
    /// Apply a partial update, clamping each provided field independently.
    pub fn apply(&self, patch: &BuffsPatch) -> Buffs {
        Buffs {
            attack: patch
                .attack
                .map(|v| clamp_int(v, MAX_BUFF))
                .unwrap_or(self.attack),
            defense: patch
                .defense
                .map(|v| clamp_int(v, MAX_BUFF))
                .unwrap_or(self.defense),
            luck: patch
                .luck
                .map(|v| clamp_int(v, MAX_BUFF))
                .unwrap_or(self.luck),
        }
    }
}
