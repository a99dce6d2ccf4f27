use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::domain::entities::{generate_party_id, Member, Party, PartyLock, PartySummary};
use crate::domain::error::PartyError;
use crate::domain::value_objects::{
    clamp_int, trim_name, BuffsPatch, Job, ProfileInput, MAX_POWER,
};
use crate::infrastructure::persistence::{self, Debouncer};

/// On-disk payload of the party snapshot: `{version, savedAt, parties: [...]}`
#[derive(Serialize)]
struct PartiesPayload {
    parties: Vec<Party>,
}

/// Load-side counterpart; entries are kept raw so one malformed party drops
/// that party, not the whole snapshot.
#[derive(Deserialize)]
struct RawPartiesPayload {
    #[serde(default)]
    parties: Vec<serde_json::Value>,
}

/// Partial member update; only provided fields are applied
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberPatch {
    pub name: Option<String>,
    pub job: Option<Job>,
    pub power: Option<f64>,
}

/// The authoritative owner of all party and member state.
///
/// Every public operation takes the write lock exactly once and performs the
/// whole lookup-check-mutate sequence under it, so each operation is atomic
/// with respect to every other. Mutations arm a debounced snapshot write;
/// nothing here ever blocks on I/O while holding the lock.
pub struct PartyStore {
    parties: Arc<RwLock<HashMap<String, Party>>>,
    persist_file: PathBuf,
    party_ttl_ms: i64,
    member_idle_ttl_ms: i64,
    saver: Debouncer,
}

impl PartyStore {
    /// Construct the store, loading any prior snapshot. Requires a tokio
    /// runtime for the persistence debouncer.
    pub fn new(config: &AppConfig) -> Self {
        let parties = Arc::new(RwLock::new(load_parties(&config.parties_file)));

        let saver = {
            let parties = parties.clone();
            let path = config.parties_file.clone();
            Debouncer::new(config.persist_debounce, move || {
                let snapshot: Vec<Party> = parties.read().unwrap().values().cloned().collect();
                persistence::save(&path, &PartiesPayload { parties: snapshot });
            })
        };

        Self {
            parties,
            persist_file: config.parties_file.clone(),
            party_ttl_ms: config.party_ttl.as_millis() as i64,
            member_idle_ttl_ms: config.member_idle_ttl.as_millis() as i64,
            saver,
        }
    }

    /// Live (non-expired) parties, most recently updated first, projected to
    /// the listing shape.
    pub fn list_parties(&self) -> Vec<PartySummary> {
        let now = chrono::Utc::now().timestamp_millis();
        let parties = self.parties.read().unwrap();
        let mut list: Vec<&Party> = parties.values().filter(|p| !p.is_expired(now)).collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        list.into_iter().map(|p| p.summary()).collect()
    }

    /// Create a new party with the caller as sole member and owner.
    ///
    /// A trimmed stable identity (when supplied) doubles as the member id so
    /// later rejoins refresh instead of duplicating; otherwise a fresh id is
    /// generated.
    pub fn create_party(
        &self,
        profile: &ProfileInput,
        title: Option<&str>,
        passcode: Option<&str>,
        user_id: Option<&str>,
    ) -> (Party, String) {
        let now = chrono::Utc::now().timestamp_millis();
        let profile = profile.sanitize();
        let stable_id = non_empty(user_id);

        let mut parties = self.parties.write().unwrap();

        let mut party_id = generate_party_id();
        while parties.contains_key(&party_id) {
            party_id = generate_party_id();
        }

        let member_id = stable_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let member = Member::new(member_id.clone(), stable_id, profile, now);

        let lock = match non_empty(passcode) {
            Some(pc) => PartyLock::locked(&party_id, &pc),
            None => PartyLock::open(),
        };

        let party = Party::new(party_id.clone(), title, lock, member, now, self.party_ttl_ms);
        parties.insert(party_id, party.clone());
        drop(parties);

        self.saver.arm();
        (party, member_id)
    }

    /// Fetch a live party. Expired parties are deleted on sight and reported
    /// as absent; every lookup in every operation goes through this check.
    pub fn get_party(&self, party_id: &str) -> Option<Party> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut parties = self.parties.write().unwrap();
        self.live_party(&mut parties, party_id, now).map(|p| p.clone())
    }

    pub fn join_party(
        &self,
        party_id: &str,
        profile: &ProfileInput,
        passcode: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<(Party, String), PartyError> {
        let now = chrono::Utc::now().timestamp_millis();
        let profile = profile.sanitize();
        let ttl = self.party_ttl_ms;

        let mut parties = self.parties.write().unwrap();
        let party = self
            .live_party(&mut parties, party_id, now)
            .ok_or(PartyError::PartyNotFound)?;

        if party.lock.enabled {
            let given = passcode.map(str::trim).unwrap_or("");
            if given.is_empty() {
                return Err(PartyError::PartyLocked);
            }
            let id = party.id.clone();
            if !party.lock.verify(&id, given) {
                return Err(PartyError::InvalidPasscode);
            }
        }

        if party.is_full() {
            return Err(PartyError::PartyFull);
        }

        let stable_id = non_empty(user_id);
        let member_id = stable_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        match party.members.get_mut(&member_id) {
            Some(existing) => {
                // Rejoin with a stable identity: refresh in place
                existing.refresh(profile, now);
                if existing.user_id.is_none() {
                    existing.user_id = stable_id;
                }
            }
            None => {
                party.members.insert(
                    member_id.clone(),
                    Member::new(member_id.clone(), stable_id, profile, now),
                );
            }
        }
        party.touch(now, ttl);
        let updated = party.clone();
        drop(parties);

        self.saver.arm();
        Ok((updated, member_id))
    }

    /// Keep-alive: refresh the member's activity timestamp and the party TTL.
    pub fn rejoin(&self, party_id: &str, member_id: &str) -> Option<Party> {
        let now = chrono::Utc::now().timestamp_millis();
        let ttl = self.party_ttl_ms;

        let mut parties = self.parties.write().unwrap();
        let party = self.live_party(&mut parties, party_id, now)?;
        party.members.get_mut(member_id)?.touch(now);
        party.touch(now, ttl);
        let updated = party.clone();
        drop(parties);

        self.saver.arm();
        Some(updated)
    }

    pub fn ping(&self, party_id: &str, member_id: &str) -> Option<Party> {
        self.rejoin(party_id, member_id)
    }

    /// Replace the party buffs (owner only). Each provided field is clamped
    /// independently; omitted fields keep their current value.
    pub fn update_buffs(
        &self,
        party_id: &str,
        member_id: &str,
        patch: &BuffsPatch,
    ) -> Result<Party, PartyError> {
        let now = chrono::Utc::now().timestamp_millis();
        let ttl = self.party_ttl_ms;

        let mut parties = self.parties.write().unwrap();
        let party = self
            .live_party(&mut parties, party_id, now)
            .ok_or(PartyError::PartyNotFound)?;
        if party.owner_id != member_id {
            return Err(PartyError::Forbidden);
        }

        party.buffs = party.buffs.apply(patch);
        party.touch(now, ttl);
        let updated = party.clone();
        drop(parties);

        self.saver.arm();
        Ok(updated)
    }

    /// Patch a member's profile fields; provided fields are validated and
    /// clamped, everything else is left alone.
    pub fn update_member(
        &self,
        party_id: &str,
        member_id: &str,
        patch: &MemberPatch,
    ) -> Option<Party> {
        let now = chrono::Utc::now().timestamp_millis();
        let ttl = self.party_ttl_ms;

        let mut parties = self.parties.write().unwrap();
        let party = self.live_party(&mut parties, party_id, now)?;
        let member = party.members.get_mut(member_id)?;

        if let Some(name) = patch.name.as_deref() {
            let name = trim_name(name);
            if !name.is_empty() {
                member.name = name;
            }
        }
        if let Some(job) = patch.job {
            member.job = job;
        }
        if let Some(power) = patch.power {
            member.power = clamp_int(power, MAX_POWER);
        }
        member.touch(now);
        party.touch(now, ttl);
        let updated = party.clone();
        drop(parties);

        self.saver.arm();
        Some(updated)
    }

    pub fn update_title(
        &self,
        party_id: &str,
        member_id: &str,
        title: &str,
    ) -> Result<Party, PartyError> {
        let now = chrono::Utc::now().timestamp_millis();
        let ttl = self.party_ttl_ms;

        let mut parties = self.parties.write().unwrap();
        let party = self
            .live_party(&mut parties, party_id, now)
            .ok_or(PartyError::PartyNotFound)?;
        if party.owner_id != member_id {
            return Err(PartyError::Forbidden);
        }

        let trimmed: String = title.trim().chars().take(crate::domain::entities::MAX_TITLE_LEN).collect();
        if trimmed.is_empty() {
            return Err(PartyError::InvalidTitle);
        }
        party.title = trimmed;
        party.touch(now, ttl);
        let updated = party.clone();
        drop(parties);

        self.saver.arm();
        Ok(updated)
    }

    /// Enable or disable the passcode gate (owner only). Enabling derives a
    /// fresh check value from the party id and the given secret.
    pub fn set_lock(
        &self,
        party_id: &str,
        member_id: &str,
        enabled: bool,
        passcode: Option<&str>,
    ) -> Result<Party, PartyError> {
        let now = chrono::Utc::now().timestamp_millis();
        let ttl = self.party_ttl_ms;

        let mut parties = self.parties.write().unwrap();
        let party = self
            .live_party(&mut parties, party_id, now)
            .ok_or(PartyError::PartyNotFound)?;
        if party.owner_id != member_id {
            return Err(PartyError::Forbidden);
        }

        if enabled {
            let pc = non_empty(passcode).ok_or(PartyError::PasscodeRequired)?;
            let id = party.id.clone();
            party.lock = PartyLock::locked(&id, &pc);
        } else {
            party.lock = PartyLock::open();
        }
        party.touch(now, ttl);
        let updated = party.clone();
        drop(parties);

        self.saver.arm();
        Ok(updated)
    }

    pub fn kick(
        &self,
        party_id: &str,
        member_id: &str,
        target_member_id: &str,
    ) -> Result<Party, PartyError> {
        let now = chrono::Utc::now().timestamp_millis();
        let ttl = self.party_ttl_ms;

        let mut parties = self.parties.write().unwrap();
        let party = self
            .live_party(&mut parties, party_id, now)
            .ok_or(PartyError::PartyNotFound)?;
        if party.owner_id != member_id {
            return Err(PartyError::Forbidden);
        }
        if target_member_id == party.owner_id {
            return Err(PartyError::CannotKickOwner);
        }
        if party.members.remove(target_member_id).is_none() {
            return Err(PartyError::NotFound);
        }

        party.touch(now, ttl);
        let updated = party.clone();
        drop(parties);

        self.saver.arm();
        Ok(updated)
    }

    pub fn transfer_owner(
        &self,
        party_id: &str,
        member_id: &str,
        target_member_id: &str,
    ) -> Result<Party, PartyError> {
        let now = chrono::Utc::now().timestamp_millis();
        let ttl = self.party_ttl_ms;

        let mut parties = self.parties.write().unwrap();
        let party = self
            .live_party(&mut parties, party_id, now)
            .ok_or(PartyError::PartyNotFound)?;
        if party.owner_id != member_id {
            return Err(PartyError::Forbidden);
        }
        if !party.members.contains_key(target_member_id) {
            return Err(PartyError::NotFound);
        }

        party.owner_id = target_member_id.to_string();
        party.touch(now, ttl);
        let updated = party.clone();
        drop(parties);

        self.saver.arm();
        Ok(updated)
    }

    /// Voluntary leave. Promotes a fallback owner when the owner departs and
    /// deletes the party once its last member is gone; an emptied party is
    /// never observable again. Returns the updated party, or `None` when the
    /// party is absent or was deleted.
    pub fn remove_member(&self, party_id: &str, member_id: &str) -> Option<Party> {
        let now = chrono::Utc::now().timestamp_millis();
        let ttl = self.party_ttl_ms;

        let mut parties = self.parties.write().unwrap();
        let party = self.live_party(&mut parties, party_id, now)?;
        party.members.remove(member_id);

        if party.members.is_empty() {
            parties.remove(party_id);
            drop(parties);
            self.saver.arm();
            return None;
        }

        party.promote_fallback_owner();
        party.touch(now, ttl);
        let updated = party.clone();
        drop(parties);

        self.saver.arm();
        Some(updated)
    }

    /// Periodic sweep: drop expired parties, evict idle members (promoting a
    /// fallback owner where needed), and delete parties that end up empty.
    /// Returns whether anything changed; a changed sweep arms exactly one
    /// snapshot write.
    pub fn cleanup(&self) -> bool {
        let now = chrono::Utc::now().timestamp_millis();
        let idle_ttl = self.member_idle_ttl_ms;
        let mut changed = false;

        let mut parties = self.parties.write().unwrap();
        parties.retain(|party_id, party| {
            if party.is_expired(now) {
                debug!(%party_id, "reaping expired party");
                changed = true;
                return false;
            }

            let before = party.members.len();
            party.members.retain(|_, m| !m.is_idle(now, idle_ttl));
            if party.members.len() != before {
                changed = true;
                party.promote_fallback_owner();
            }

            if party.members.is_empty() {
                debug!(%party_id, "reaping emptied party");
                changed = true;
                return false;
            }
            true
        });
        drop(parties);

        if changed {
            self.saver.arm();
        }
        changed
    }

    /// Write the current state immediately, bypassing the debounce window.
    /// Called on shutdown so a pending debounced write is not lost.
    pub fn flush(&self) {
        let snapshot: Vec<Party> = self.parties.read().unwrap().values().cloned().collect();
        persistence::save(&self.persist_file, &PartiesPayload { parties: snapshot });
    }

    fn live_party<'a>(
        &self,
        parties: &'a mut HashMap<String, Party>,
        party_id: &str,
        now: i64,
    ) -> Option<&'a mut Party> {
        let expired = parties.get(party_id)?.is_expired(now);
        if expired {
            parties.remove(party_id);
            self.saver.arm();
            return None;
        }
        parties.get_mut(party_id)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn load_parties(path: &Path) -> HashMap<String, Party> {
    let mut parties = HashMap::new();
    let Some(payload) = persistence::load::<RawPartiesPayload>(path) else {
        return parties;
    };

    let now = chrono::Utc::now().timestamp_millis();
    for raw in payload.parties {
        let Ok(mut party) = serde_json::from_value::<Party>(raw) else {
            debug!("dropping malformed party from snapshot");
            continue;
        };
        // Shape checks: expired or empty entries are dropped, not repaired
        if party.id.is_empty() || party.is_expired(now) || party.members.is_empty() {
            continue;
        }
        // The owner must be a member; older snapshots may predate that check
        party.promote_fallback_owner();
        parties.insert(party.id.clone(), party);
    }

    info!(count = parties.len(), "loaded parties from disk");
    parties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscordConfig;
    use std::time::Duration;

    fn test_config(dir: &Path) -> AppConfig {
        AppConfig {
            port: 0,
            allowed_origins: vec!["*".into()],
            web_origin: "http://localhost".into(),
            parties_file: dir.join("parties.json"),
            profiles_file: dir.join("profiles.json"),
            party_ttl: Duration::from_secs(3600),
            member_idle_ttl: Duration::from_secs(1800),
            session_ttl: Duration::from_secs(3600),
            persist_debounce: Duration::from_millis(10),
            broadcast_debounce: Duration::from_millis(10),
            reap_interval: Duration::from_secs(60),
            discord: DiscordConfig {
                client_id: String::new(),
                client_secret: String::new(),
                redirect_uri: String::new(),
            },
        }
    }

    fn profile(name: &str) -> ProfileInput {
        ProfileInput {
            name: name.into(),
            job: Job::Warrior,
            power: 1000.0,
        }
    }

    #[tokio::test]
    async fn create_makes_creator_sole_owner() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, member_id) = store.create_party(&profile("alice"), Some("raid"), None, None);
        assert_eq!(party.owner_id, member_id);
        assert_eq!(party.member_count(), 1);
        assert_eq!(party.title, "raid");
        assert!(!party.lock.enabled);
    }

    #[tokio::test]
    async fn join_at_capacity_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, _) = store.create_party(&profile("owner"), None, None, None);
        for i in 1..6 {
            store
                .join_party(&party.id, &profile(&format!("m{}", i)), None, None)
                .unwrap();
        }

        let err = store
            .join_party(&party.id, &profile("late"), None, None)
            .unwrap_err();
        assert_eq!(err, PartyError::PartyFull);
        assert_eq!(store.get_party(&party.id).unwrap().member_count(), 6);
    }

    #[tokio::test]
    async fn locked_party_join_scenarios() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, _) = store.create_party(&profile("owner"), None, Some("1234"), None);

        assert!(store
            .join_party(&party.id, &profile("ok"), Some("1234"), None)
            .is_ok());
        assert_eq!(
            store
                .join_party(&party.id, &profile("bad"), Some("9999"), None)
                .unwrap_err(),
            PartyError::InvalidPasscode
        );
        assert_eq!(
            store
                .join_party(&party.id, &profile("none"), None, None)
                .unwrap_err(),
            PartyError::PartyLocked
        );
    }

    #[tokio::test]
    async fn passcode_is_ignored_when_unlocked() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, _) = store.create_party(&profile("owner"), None, None, None);
        assert!(store
            .join_party(&party.id, &profile("joiner"), Some("whatever"), None)
            .is_ok());
    }

    #[tokio::test]
    async fn stable_identity_rejoin_updates_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, member_id) =
            store.create_party(&profile("alice"), None, None, Some("discord-1"));
        assert_eq!(member_id, "discord-1");

        let (updated, rejoin_id) = store
            .join_party(
                &party.id,
                &ProfileInput {
                    name: "alice-renamed".into(),
                    job: Job::Mage,
                    power: 2000.0,
                },
                None,
                Some("discord-1"),
            )
            .unwrap();

        assert_eq!(rejoin_id, "discord-1");
        assert_eq!(updated.member_count(), 1);
        let m = &updated.members["discord-1"];
        assert_eq!(m.name, "alice-renamed");
        assert_eq!(m.job, Job::Mage);
    }

    #[tokio::test]
    async fn kick_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, owner_id) = store.create_party(&profile("owner"), None, None, None);
        let (_, member_id) = store
            .join_party(&party.id, &profile("victim"), None, None)
            .unwrap();

        assert_eq!(
            store.kick(&party.id, &owner_id, "nobody").unwrap_err(),
            PartyError::NotFound
        );
        assert_eq!(
            store.kick(&party.id, &owner_id, &owner_id).unwrap_err(),
            PartyError::CannotKickOwner
        );
        assert_eq!(
            store.kick(&party.id, &member_id, &owner_id).unwrap_err(),
            PartyError::Forbidden
        );

        let updated = store.kick(&party.id, &owner_id, &member_id).unwrap();
        assert!(!updated.members.contains_key(&member_id));
    }

    #[tokio::test]
    async fn transfer_owner_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, owner_id) = store.create_party(&profile("owner"), None, None, None);
        let (_, member_id) = store
            .join_party(&party.id, &profile("next"), None, None)
            .unwrap();

        assert_eq!(
            store
                .transfer_owner(&party.id, &owner_id, "ghost")
                .unwrap_err(),
            PartyError::NotFound
        );

        let updated = store
            .transfer_owner(&party.id, &owner_id, &member_id)
            .unwrap();
        assert_eq!(updated.owner_id, member_id);

        // The previous owner no longer holds elevated rights
        assert_eq!(
            store
                .update_title(&party.id, &owner_id, "mine again")
                .unwrap_err(),
            PartyError::Forbidden
        );
    }

    #[tokio::test]
    async fn owner_leave_promotes_earliest_joined_member() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, owner_id) = store.create_party(&profile("owner"), None, None, None);
        store
            .join_party(&party.id, &profile("second"), None, Some("aaa"))
            .unwrap();
        store
            .join_party(&party.id, &profile("third"), None, Some("bbb"))
            .unwrap();

        let updated = store.remove_member(&party.id, &owner_id).unwrap();
        assert_eq!(updated.owner_id, "aaa");
        assert_eq!(updated.member_count(), 2);
    }

    #[tokio::test]
    async fn last_member_leaving_deletes_party() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, owner_id) = store.create_party(&profile("owner"), None, None, None);
        assert!(store.remove_member(&party.id, &owner_id).is_none());
        assert!(store.get_party(&party.id).is_none());
        assert!(store.list_parties().is_empty());
    }

    #[tokio::test]
    async fn expired_party_is_unreachable_and_lazily_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, _) = store.create_party(&profile("owner"), None, None, None);
        store
            .parties
            .write()
            .unwrap()
            .get_mut(&party.id)
            .unwrap()
            .expires_at = 1;

        assert!(store.list_parties().is_empty());
        assert!(store.get_party(&party.id).is_none());
        // Deleted on read, not merely filtered
        assert!(!store.parties.read().unwrap().contains_key(&party.id));
    }

    #[tokio::test]
    async fn mutations_on_expired_party_report_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, owner_id) = store.create_party(&profile("owner"), None, None, None);
        store
            .parties
            .write()
            .unwrap()
            .get_mut(&party.id)
            .unwrap()
            .expires_at = 1;

        assert_eq!(
            store
                .update_title(&party.id, &owner_id, "too late")
                .unwrap_err(),
            PartyError::PartyNotFound
        );
    }

    #[tokio::test]
    async fn title_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, owner_id) = store.create_party(&profile("owner"), None, None, None);
        let (_, member_id) = store
            .join_party(&party.id, &profile("pleb"), None, None)
            .unwrap();

        assert_eq!(
            store
                .update_title(&party.id, &member_id, "hijack")
                .unwrap_err(),
            PartyError::Forbidden
        );
        assert_eq!(
            store.update_title(&party.id, &owner_id, "   ").unwrap_err(),
            PartyError::InvalidTitle
        );
        let updated = store
            .update_title(&party.id, &owner_id, "  weekly run  ")
            .unwrap();
        assert_eq!(updated.title, "weekly run");
    }

    #[tokio::test]
    async fn buff_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, owner_id) = store.create_party(&profile("owner"), None, None, None);
        let (_, member_id) = store
            .join_party(&party.id, &profile("pleb"), None, None)
            .unwrap();

        assert_eq!(
            store
                .update_buffs(&party.id, &member_id, &BuffsPatch::default())
                .unwrap_err(),
            PartyError::Forbidden
        );

        let updated = store
            .update_buffs(
                &party.id,
                &owner_id,
                &BuffsPatch {
                    attack: Some(50_000.0),
                    defense: Some(-3.0),
                    luck: None,
                },
            )
            .unwrap();
        assert_eq!(updated.buffs.attack, 9_999);
        assert_eq!(updated.buffs.defense, 0);
        assert_eq!(updated.buffs.luck, 0);
    }

    #[tokio::test]
    async fn lock_toggle_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, owner_id) = store.create_party(&profile("owner"), None, None, None);

        assert_eq!(
            store
                .set_lock(&party.id, &owner_id, true, None)
                .unwrap_err(),
            PartyError::PasscodeRequired
        );

        store
            .set_lock(&party.id, &owner_id, true, Some("pw"))
            .unwrap();
        assert_eq!(
            store
                .join_party(&party.id, &profile("x"), Some("nope"), None)
                .unwrap_err(),
            PartyError::InvalidPasscode
        );

        store.set_lock(&party.id, &owner_id, false, None).unwrap();
        assert!(store
            .join_party(&party.id, &profile("x"), None, None)
            .is_ok());
    }

    #[tokio::test]
    async fn power_is_clamped_on_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, member_id) = store.create_party(
            &ProfileInput {
                name: "neg".into(),
                job: Job::Rogue,
                power: -5.0,
            },
            None,
            None,
            None,
        );
        assert_eq!(party.members[&member_id].power, 0);

        let (updated, joiner_id) = store
            .join_party(
                &party.id,
                &ProfileInput {
                    name: "big".into(),
                    job: Job::Rogue,
                    power: 200_000.0,
                },
                None,
                None,
            )
            .unwrap();
        assert_eq!(updated.members[&joiner_id].power, 99_999);
    }

    #[tokio::test]
    async fn cleanup_evicts_idle_members_and_promotes() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (party, owner_id) = store.create_party(&profile("owner"), None, None, None);
        let (_, member_id) = store
            .join_party(&party.id, &profile("fresh"), None, None)
            .unwrap();

        store
            .parties
            .write()
            .unwrap()
            .get_mut(&party.id)
            .unwrap()
            .members
            .get_mut(&owner_id)
            .unwrap()
            .last_seen_at = 1;

        assert!(store.cleanup());
        let updated = store.get_party(&party.id).unwrap();
        assert!(!updated.members.contains_key(&owner_id));
        assert_eq!(updated.owner_id, member_id);
    }

    #[tokio::test]
    async fn cleanup_deletes_expired_and_emptied_parties() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (expired, _) = store.create_party(&profile("a"), None, None, None);
        let (idle, _) = store.create_party(&profile("b"), None, None, None);
        let (alive, _) = store.create_party(&profile("c"), None, None, None);

        {
            let mut parties = store.parties.write().unwrap();
            parties.get_mut(&expired.id).unwrap().expires_at = 1;
            for m in parties.get_mut(&idle.id).unwrap().members.values_mut() {
                m.last_seen_at = 1;
            }
        }

        assert!(store.cleanup());
        assert!(store.get_party(&expired.id).is_none());
        assert!(store.get_party(&idle.id).is_none());
        assert!(store.get_party(&alive.id).is_some());

        // Nothing left to do: a second sweep reports no change
        assert!(!store.cleanup());
    }

    #[tokio::test]
    async fn flush_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let (party_id, member_id) = {
            let store = PartyStore::new(&config);
            let (party, member_id) =
                store.create_party(&profile("owner"), Some("persisted"), Some("pw"), None);
            store.flush();
            (party.id, member_id)
        };

        let reloaded = PartyStore::new(&config);
        let party = reloaded.get_party(&party_id).unwrap();
        assert_eq!(party.title, "persisted");
        assert_eq!(party.owner_id, member_id);
        // The lock survives persistence, so the passcode still gates joins
        assert_eq!(
            reloaded
                .join_party(&party_id, &profile("x"), None, None)
                .unwrap_err(),
            PartyError::PartyLocked
        );
        assert!(reloaded
            .join_party(&party_id, &profile("x"), Some("pw"), None)
            .is_ok());
    }

    #[tokio::test]
    async fn load_drops_expired_and_empty_entries() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        {
            let store = PartyStore::new(&config);
            let (good, _) = store.create_party(&profile("good"), None, None, None);
            let (expired, _) = store.create_party(&profile("expired"), None, None, None);
            let (empty, _) = store.create_party(&profile("empty"), None, None, None);

            {
                let mut parties = store.parties.write().unwrap();
                parties.get_mut(&expired.id).unwrap().expires_at = 1;
                parties.get_mut(&empty.id).unwrap().members.clear();
            }
            store.flush();

            let reloaded = PartyStore::new(&config);
            assert!(reloaded.get_party(&good.id).is_some());
            assert!(reloaded.get_party(&expired.id).is_none());
            assert!(reloaded.get_party(&empty.id).is_none());
        }
    }

    #[tokio::test]
    async fn listing_is_sorted_by_recency_and_hides_check_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = PartyStore::new(&test_config(dir.path()));

        let (first, first_owner) = store.create_party(&profile("a"), None, Some("pw"), None);
        let (second, _) = store.create_party(&profile("b"), None, None, None);

        // Touch the first party so it becomes the most recent
        {
            let mut parties = store.parties.write().unwrap();
            let p = parties.get_mut(&second.id).unwrap();
            p.updated_at -= 10_000;
        }
        store.rejoin(&first.id, &first_owner).unwrap();

        let list = store.list_parties();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, first.id);
        assert!(list[0].locked);

        let json = serde_json::to_value(&list).unwrap();
        assert!(!json.to_string().contains("passcodeHash"));
    }
}
