use std::sync::Arc;

use crate::config::AppConfig;
use crate::infrastructure::auth::DiscordOauth;
use crate::infrastructure::services::{Broadcaster, SessionManager};
use crate::infrastructure::stores::{PartyStore, ProfileStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    /// Authoritative party and member state
    pub party_store: Arc<PartyStore>,

    /// Saved character profiles
    pub profile_store: Arc<ProfileStore>,

    /// Login sessions, keyed by opaque cookie token
    pub sessions: Arc<SessionManager>,

    /// Discord OAuth client
    pub oauth: Arc<DiscordOauth>,

    /// Event fan-out for SSE
    pub broadcaster: Arc<Broadcaster>,
}

impl AppState {
    /// Wire up the state. Loads both snapshots and spawns the debounce
    /// tasks, so this needs a running tokio runtime.
    pub fn new(config: AppConfig) -> Self {
        let party_store = Arc::new(PartyStore::new(&config));
        let profile_store = Arc::new(ProfileStore::new(&config));
        let sessions = Arc::new(SessionManager::new(config.session_ttl));
        let oauth = Arc::new(DiscordOauth::new(config.discord.clone()));
        let broadcaster = Arc::new(Broadcaster::new(
            config.broadcast_debounce,
            party_store.clone(),
        ));

        Self {
            config: Arc::new(config),
            party_store,
            profile_store,
            sessions,
            oauth,
            broadcaster,
        }
    }

    /// Write both snapshots immediately. Called on shutdown so pending
    /// debounced writes are not lost.
    pub fn flush(&self) {
        self.party_store.flush();
        self.profile_store.flush();
    }
}
