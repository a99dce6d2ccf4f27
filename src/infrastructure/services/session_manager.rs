use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::infrastructure::auth::DiscordUser;

/// A logged-in browser session, addressed by an opaque bearer token
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    #[serde(skip_serializing)]
    pub token: String,
    pub user: DiscordUser,
    pub created_at: i64,
    pub expires_at: i64,
}

impl UserSession {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

/// In-memory session registry.
///
/// Tokens are opaque random strings carried in a cookie; they hold no claims,
/// so every lookup goes through the registry. Sessions vanish on restart and
/// users simply log in again.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, UserSession>>,
    ttl_ms: i64,
}

impl SessionManager {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl_ms: ttl.as_millis() as i64,
        }
    }

    /// Mint a session for a freshly authenticated user.
    pub fn create(&self, user: DiscordUser) -> UserSession {
        let now = chrono::Utc::now().timestamp_millis();
        let session = UserSession {
            token: generate_token(),
            user,
            created_at: now,
            expires_at: now + self.ttl_ms,
        };

        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(session.token.clone(), session.clone());
        session
    }

    /// Resolve a token. Expired sessions are deleted on sight.
    pub fn get(&self, token: &str) -> Option<UserSession> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut sessions = self.sessions.write().unwrap();
        match sessions.get(token) {
            Some(session) if session.is_expired(now) => {
                sessions.remove(token);
                None
            }
            Some(session) => Some(session.clone()),
            None => None,
        }
    }

    pub fn remove(&self, token: &str) {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(token);
    }

    /// Drop all expired sessions; returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = chrono::Utc::now().timestamp_millis();
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        before - sessions.len()
    }

    pub fn count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}

fn generate_token() -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}
