use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DiscordConfig;

const DISCORD_API: &str = "https://discord.com/api";

#[derive(Debug, thiserror::Error)]
pub enum OauthError {
    #[error("Discord OAuth is not configured")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Discord returned status {0}")]
    BadStatus(reqwest::StatusCode),
}

/// The identity Discord reports for `/users/@me` with the `identify` scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl DiscordUser {
    /// Preferred display name: the global name when set, else the username.
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Discord OAuth2 authorization-code client (`identify` scope only).
pub struct DiscordOauth {
    client: Client,
    config: DiscordConfig,
}

impl DiscordOauth {
    pub fn new(config: DiscordConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to create HTTP client");
        Self { client, config }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty()
            && !self.config.client_secret.is_empty()
            && !self.config.redirect_uri.is_empty()
    }

    /// URL the browser is sent to for the consent screen.
    pub fn authorize_url(&self) -> Result<String, OauthError> {
        if !self.is_configured() {
            return Err(OauthError::NotConfigured);
        }
        Ok(format!(
            "{}/oauth2/authorize?client_id={}&redirect_uri={}&response_type=code&scope=identify",
            DISCORD_API,
            urlencode(&self.config.client_id),
            urlencode(&self.config.redirect_uri),
        ))
    }

    /// Redeem the authorization code and fetch the user's identity.
    pub async fn exchange_code(&self, code: &str) -> Result<DiscordUser, OauthError> {
        if !self.is_configured() {
            return Err(OauthError::NotConfigured);
        }

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        let response = self
            .client
            .post(format!("{}/oauth2/token", DISCORD_API))
            .form(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(OauthError::BadStatus(response.status()));
        }
        let token: TokenResponse = response.json().await?;

        let response = self
            .client
            .get(format!("{}/users/@me", DISCORD_API))
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(OauthError::BadStatus(response.status()));
        }
        let user: DiscordUser = response.json().await?;
        debug!(user_id = %user.id, "discord login completed");
        Ok(user)
    }
}

/// Percent-encode a query component. Only covers the characters that can
/// appear in client ids and redirect URIs.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
