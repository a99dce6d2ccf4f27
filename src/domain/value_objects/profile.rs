use serde::{Deserialize, Serialize};

use super::{clamp_int, Job, MAX_POWER};

/// Maximum length of a member display name, in characters
pub const MAX_NAME_LEN: usize = 20;

/// A player's display profile, as stored and as attached to party members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub name: String,
    pub job: Job,
    pub power: u32,
}

/// Raw profile fields as supplied by a client.
///
/// The request layer validates these too, but the stores never trust that:
/// everything is trimmed and clamped again before storage.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    pub name: String,
    pub job: Job,
    pub power: f64,
}

impl ProfileInput {
    pub fn sanitize(&self) -> PlayerProfile {
        PlayerProfile {
            name: trim_name(&self.name),
            job: self.job,
            power: clamp_int(self.power, MAX_POWER),
        }
    }
}

/// Trim surrounding whitespace and cut to the display-name limit.
pub fn trim_name(raw: &str) -> String {
    raw.trim().chars().take(MAX_NAME_LEN).collect()
}
