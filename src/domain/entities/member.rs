use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Job, PlayerProfile};

/// A participant record within a party, distinct from global user identity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    /// Stable external identity (Discord user id), when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
    pub job: Job,
    pub power: u32,
    pub joined_at: i64,
    pub last_seen_at: i64,
}

impl Member {
    pub fn new(id: String, user_id: Option<String>, profile: PlayerProfile, now: i64) -> Self {
        Self {
            id,
            user_id,
            name: profile.name,
            job: profile.job,
            power: profile.power,
            joined_at: now,
            last_seen_at: now,
        }
    }

    /// Rejoin-as-update: refresh the profile fields and activity timestamp
    /// without touching `joined_at`.
    pub fn refresh(&mut self, profile: PlayerProfile, now: i64) {
        self.name = profile.name;
        self.job = profile.job;
        self.power = profile.power;
        self.last_seen_at = now;
    }

    pub fn touch(&mut self, now: i64) {
        self.last_seen_at = now;
    }

    pub fn is_idle(&self, now: i64, idle_ttl_ms: i64) -> bool {
        self.last_seen_at + idle_ttl_ms < now
    }
}
