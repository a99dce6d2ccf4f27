use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::entities::Member;
use crate::domain::value_objects::{Buffs, Job};

/// Default member capacity of a party
pub const MAX_MEMBERS_DEFAULT: u32 = 6;

/// Maximum length of a party title, in characters
pub const MAX_TITLE_LEN: usize = 30;

/// Placeholder title used when the creator supplies none
pub const DEFAULT_TITLE: &str = "Party";

/// Passcode gate on a party.
///
/// The passcode itself is never stored; only a check value derived from the
/// party id and the secret, so the same secret yields different check values
/// on different parties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyLock {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passcode_hash: Option<String>,
}

impl PartyLock {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn locked(party_id: &str, passcode: &str) -> Self {
        Self {
            enabled: true,
            passcode_hash: Some(hash_passcode(party_id, passcode)),
        }
    }

    /// Compare a given secret against the stored check value. Raw secrets are
    /// never compared directly.
    pub fn verify(&self, party_id: &str, passcode: &str) -> bool {
        match &self.passcode_hash {
            Some(stored) => *stored == hash_passcode(party_id, passcode),
            None => false,
        }
    }
}

/// Derive the one-way check value for a party passcode.
pub fn hash_passcode(party_id: &str, passcode: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", party_id, passcode).as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// A bounded-size, time-limited group session with one owner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    #[serde(default = "default_max_members")]
    pub max_members: u32,
    #[serde(default)]
    pub lock: PartyLock,
    pub created_at: i64,
    pub updated_at: i64,
    /// Rolling idle deadline: always `updated_at + PARTY_TTL`
    pub expires_at: i64,
    #[serde(default)]
    pub buffs: Buffs,
    pub members: HashMap<String, Member>,
}

impl Party {
    pub fn new(
        id: String,
        title: Option<&str>,
        lock: PartyLock,
        owner: Member,
        now: i64,
        ttl_ms: i64,
    ) -> Self {
        let owner_id = owner.id.clone();
        let mut members = HashMap::new();
        members.insert(owner_id.clone(), owner);
        Self {
            id,
            title: sanitize_title(title),
            owner_id,
            max_members: MAX_MEMBERS_DEFAULT,
            lock,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl_ms,
            buffs: Buffs::default(),
            members,
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_full(&self) -> bool {
        self.member_count() >= self.max_members as usize
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }

    /// Refresh the activity timestamps; every successful mutation goes
    /// through here so the idle deadline keeps rolling forward.
    pub fn touch(&mut self, now: i64, ttl_ms: i64) {
        self.updated_at = now;
        self.expires_at = now + ttl_ms;
    }

    /// If the owner is no longer a member, hand ownership to the remaining
    /// member who joined earliest (ties broken by id). Returns the new owner
    /// id when a transfer happened.
    pub fn promote_fallback_owner(&mut self) -> Option<String> {
        if self.members.contains_key(&self.owner_id) {
            return None;
        }
        let next = self
            .members
            .values()
            .min_by(|a, b| {
                a.joined_at
                    .cmp(&b.joined_at)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|m| m.id.clone());
        if let Some(id) = &next {
            self.owner_id = id.clone();
        }
        next
    }

    /// Listing projection: no buffs, no check value, members sorted by
    /// recency.
    pub fn summary(&self) -> PartySummary {
        let mut members: Vec<MemberSummary> = self
            .members
            .values()
            .map(|m| MemberSummary {
                id: m.id.clone(),
                name: m.name.clone(),
                job: m.job,
                power: m.power,
                last_seen_at: m.last_seen_at,
            })
            .collect();
        members.sort_by(|a, b| b.last_seen_at.cmp(&a.last_seen_at));

        PartySummary {
            id: self.id.clone(),
            title: self.title.clone(),
            owner_id: self.owner_id.clone(),
            max_members: self.max_members,
            locked: self.lock.enabled,
            members_count: self.member_count(),
            members,
            updated_at: self.updated_at,
            expires_at: self.expires_at,
        }
    }

    /// Full projection sent to party members. The passcode check value never
    /// leaves the store, so the lock collapses to a flag here.
    pub fn detail(&self) -> PartyDetail {
        let mut members: Vec<Member> = self.members.values().cloned().collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));

        PartyDetail {
            id: self.id.clone(),
            title: self.title.clone(),
            owner_id: self.owner_id.clone(),
            max_members: self.max_members,
            locked: self.lock.enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
            expires_at: self.expires_at,
            buffs: self.buffs,
            members,
        }
    }
}

/// Member fields exposed in the party listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    pub id: String,
    pub name: String,
    pub job: Job,
    pub power: u32,
    pub last_seen_at: i64,
}

/// Party fields exposed in the party listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartySummary {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    pub max_members: u32,
    pub locked: bool,
    pub members_count: usize,
    pub members: Vec<MemberSummary>,
    pub updated_at: i64,
    pub expires_at: i64,
}

/// Party fields exposed to its members
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyDetail {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    pub max_members: u32,
    pub locked: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub expires_at: i64,
    pub buffs: Buffs,
    pub members: Vec<Member>,
}

fn default_max_members() -> u32 {
    MAX_MEMBERS_DEFAULT
}

/// Trim a raw title and cut it to length, falling back to the placeholder.
pub fn sanitize_title(raw: Option<&str>) -> String {
    let trimmed = raw.unwrap_or("").trim();
    if trimmed.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        trimmed.chars().take(MAX_TITLE_LEN).collect()
    }
}

/// Generate a random short party id
pub fn generate_party_id() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";
    let mut rng = rand::thread_rng();
    (0..8)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}
