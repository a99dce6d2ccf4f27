use std::path::PathBuf;
use std::time::Duration;

/// Immutable runtime configuration, read once from the environment and
/// injected into [`crate::infrastructure::app_state::AppState`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port
    pub port: u16,
    /// Allowed CORS origins; a lone "*" means any origin
    pub allowed_origins: Vec<String>,
    /// Frontend origin users are redirected to after login
    pub web_origin: String,
    /// Snapshot file for the party store
    pub parties_file: PathBuf,
    /// Snapshot file for the profile store
    pub profiles_file: PathBuf,
    /// Idle window after which an untouched party expires
    pub party_ttl: Duration,
    /// Idle window after which a silent member is evicted
    pub member_idle_ttl: Duration,
    /// Lifetime of a login session
    pub session_ttl: Duration,
    /// Debounce window for snapshot writes
    pub persist_debounce: Duration,
    /// Debounce window for the coalesced party-list broadcast
    pub broadcast_debounce: Duration,
    /// Interval between idle-reaper sweeps
    pub reap_interval: Duration,
    pub discord: DiscordConfig,
}

/// Discord OAuth application credentials
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl AppConfig {
    /// Read the configuration from the environment, applying defaults for
    /// everything except the Discord credentials (which stay empty and make
    /// the login routes fail loudly when unset).
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 4000),
            allowed_origins: std::env::var("ORIGIN")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            web_origin: std::env::var("WEB_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            parties_file: std::env::var("PERSIST_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/parties.json")),
            profiles_file: std::env::var("PROFILES_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/profiles.json")),
            // Default: parties end after 2h without activity
            party_ttl: Duration::from_millis(env_parse("PARTY_TTL_MS", 2 * 60 * 60 * 1000)),
            // Default: members are evicted after 30min without activity
            member_idle_ttl: Duration::from_millis(env_parse("MEMBER_IDLE_TTL_MS", 30 * 60 * 1000)),
            session_ttl: Duration::from_millis(env_parse(
                "SESSION_TTL_MS",
                7 * 24 * 60 * 60 * 1000,
            )),
            persist_debounce: Duration::from_millis(env_parse("PERSIST_DEBOUNCE_MS", 250)),
            broadcast_debounce: Duration::from_millis(env_parse("BROADCAST_DEBOUNCE_MS", 150)),
            reap_interval: Duration::from_millis(env_parse("REAP_INTERVAL_MS", 60_000)),
            discord: DiscordConfig {
                client_id: std::env::var("DISCORD_CLIENT_ID").unwrap_or_default(),
                client_secret: std::env::var("DISCORD_CLIENT_SECRET").unwrap_or_default(),
                redirect_uri: std::env::var("DISCORD_REDIRECT_URI").unwrap_or_default(),
            },
        }
    }

    pub fn any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
