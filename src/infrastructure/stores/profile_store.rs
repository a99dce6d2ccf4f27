use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::AppConfig;
use crate::domain::value_objects::{PlayerProfile, ProfileInput};
use crate::infrastructure::persistence::{self, Debouncer};

#[derive(Serialize, Deserialize)]
struct ProfilesPayload {
    profiles: HashMap<String, PlayerProfile>,
}

/// Saved character profiles, keyed by the stable user id. Lets a returning
/// user skip re-entering their character before creating or joining a party.
pub struct ProfileStore {
    profiles: Arc<RwLock<HashMap<String, PlayerProfile>>>,
    persist_file: PathBuf,
    saver: Debouncer,
}

impl ProfileStore {
    pub fn new(config: &AppConfig) -> Self {
        let profiles = persistence::load::<ProfilesPayload>(&config.profiles_file)
            .map(|p| p.profiles)
            .unwrap_or_default();
        if !profiles.is_empty() {
            info!(count = profiles.len(), "loaded profiles from disk");
        }
        let profiles = Arc::new(RwLock::new(profiles));

        let saver = {
            let profiles = profiles.clone();
            let path = config.profiles_file.clone();
            Debouncer::new(config.persist_debounce, move || {
                let snapshot = profiles.read().unwrap().clone();
                persistence::save(&path, &ProfilesPayload { profiles: snapshot });
            })
        };

        Self {
            profiles,
            persist_file: config.profiles_file.clone(),
            saver,
        }
    }

    pub fn get(&self, user_id: &str) -> Option<PlayerProfile> {
        self.profiles.read().unwrap().get(user_id).cloned()
    }

    /// Sanitize and store the profile, returning the stored form.
    pub fn set(&self, user_id: &str, input: &ProfileInput) -> PlayerProfile {
        let profile = input.sanitize();
        self.profiles
            .write()
            .unwrap()
            .insert(user_id.to_string(), profile.clone());
        self.saver.arm();
        profile
    }

    /// Write the current state immediately, bypassing the debounce window.
    pub fn flush(&self) {
        let snapshot = self.profiles.read().unwrap().clone();
        persistence::save(
            &self.persist_file,
            &ProfilesPayload { profiles: snapshot },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscordConfig;
    use crate::domain::value_objects::Job;
    use std::time::Duration;

    fn test_config(dir: &std::path::Path) -> AppConfig {
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

    #[tokio::test]
    async fn set_sanitizes_and_get_returns_stored_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(&test_config(dir.path()));

        assert!(store.get("u1").is_none());

        let stored = store.set(
            "u1",
            &ProfileInput {
                name: "  hero  ".into(),
                job: Job::Archer,
                power: 123_456.0,
            },
        );
        assert_eq!(stored.name, "hero");
        assert_eq!(stored.power, 99_999);
        assert_eq!(store.get("u1"), Some(stored));
    }

    #[tokio::test]
    async fn flush_and_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        {
            let store = ProfileStore::new(&config);
            store.set(
                "u1",
                &ProfileInput {
                    name: "hero".into(),
                    job: Job::Mage,
                    power: 42.0,
                },
            );
            store.flush();
        }

        let reloaded = ProfileStore::new(&config);
        let profile = reloaded.get("u1").unwrap();
        assert_eq!(profile.name, "hero");
        assert_eq!(profile.job, Job::Mage);
        assert_eq!(profile.power, 42);
    }
}
