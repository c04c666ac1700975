//! REST client for the Discord OAuth2 and guild-membership endpoints.
//!
//! Wraps the three calls the identity exchange needs: authorization-code
//! exchange, the current user's profile, and the current user's membership
//! in the configured guild.

use std::time::Duration;

use serde::Deserialize;

use crate::config::DiscordConfig;

/// Discord REST API base URL.
const API_BASE: &str = "https://discord.com/api/v10";

/// HTTP request timeout for a single identity-provider call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the identity provider layer.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Discord returned a non-2xx status code.
    #[error("Discord API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// Response from the OAuth2 token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub scope: String,
}

/// The authenticated Discord user's profile.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    pub discriminator: Option<String>,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
}

/// The authenticated user's membership in a guild.
#[derive(Debug, Deserialize)]
pub struct GuildMember {
    pub user: Option<DiscordUser>,
    pub roles: Vec<String>,
    pub nick: Option<String>,
}

/// HTTP client for the Discord API.
pub struct DiscordClient {
    client: reqwest::Client,
    config: DiscordConfig,
    api_base: String,
}

impl DiscordClient {
    /// Create a client with the given application credentials.
    pub fn new(config: DiscordConfig) -> Self {
        Self::with_api_base(config, API_BASE.to_string())
    }

    /// Create a client against a non-default API base URL (used by tests
    /// to point at a stub provider).
    pub fn with_api_base(config: DiscordConfig, api_base: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            config,
            api_base,
        }
    }

    /// The configured role ids: `(maj, yc, admin)`.
    pub fn role_ids(&self) -> (&str, &str, &str) {
        (
            &self.config.maj_role_id,
            &self.config.yc_role_id,
            &self.config.admin_role_id,
        )
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, DiscordError> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .client
            .post(format!("{}/oauth2/token", self.api_base))
            .form(&params)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the authenticated user's profile.
    pub async fn current_user(&self, access_token: &str) -> Result<DiscordUser, DiscordError> {
        let response = self
            .client
            .get(format!("{}/users/@me", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the authenticated user's membership in the configured guild.
    ///
    /// Returns `None` when Discord answers 404, meaning the user is not a
    /// member.
    pub async fn guild_member(
        &self,
        access_token: &str,
    ) -> Result<Option<GuildMember>, DiscordError> {
        let response = self
            .client
            .get(format!(
                "{}/users/@me/guilds/{}/member",
                self.api_base, self.config.guild_id
            ))
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        Self::parse_response(response).await.map(Some)
    }

    /// Deserialize a 2xx response body, or surface the status and body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DiscordError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiscordError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
