//! Handler for the identity exchange (`POST /functions/v1/discord-auth`).

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use eggboard_core::error::CoreError;
use eggboard_core::roles::{ACCESS_ADMIN, ACCESS_USER};

use crate::auth::jwt::{generate_session_token, SessionProfile};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /discord-auth`.
#[derive(Debug, Deserialize)]
pub struct DiscordAuthRequest {
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
}

/// Successful exchange response.
#[derive(Debug, Serialize)]
pub struct DiscordAuthResponse {
    pub jwt: String,
    pub user: UserInfo,
    pub access_level: String,
    /// Session expiry (UTC Unix timestamp).
    pub expires_at: i64,
}

/// Public profile embedded in [`DiscordAuthResponse`].
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub discord_id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// POST /functions/v1/discord-auth
///
/// Exchange an authorization code for a signed session token. Membership
/// in the configured guild plus one of the member roles is required;
/// admin access is derived from the admin roles.
pub async fn discord_auth(
    State(state): State<AppState>,
    Json(input): Json<DiscordAuthRequest>,
) -> AppResult<Json<DiscordAuthResponse>> {
    // 1. Validate input; missing fields are a 400, not a 422.
    let code = input
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing required field: code".into()))?;
    let redirect_uri = input
        .redirect_uri
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing required field: redirect_uri".into()))?;

    // 2. Exchange the code and fetch the user's profile.
    let token = state
        .discord
        .exchange_code(&code, &redirect_uri)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Authorization code exchange failed");
            AppError::Core(CoreError::Upstream("Authentication failed".into()))
        })?;

    let user = state
        .discord
        .current_user(&token.access_token)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Profile fetch failed");
            AppError::Core(CoreError::Upstream("Authentication failed".into()))
        })?;

    // 3. Guild membership gate: a 404 from the IdP means not a member.
    let member = state
        .discord
        .guild_member(&token.access_token)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Membership lookup failed");
            AppError::Core(CoreError::Upstream("Authentication failed".into()))
        })?
        .ok_or_else(|| {
            AppError::AccessDenied(
                "You must be a member of the co-op's Discord server to sign in".into(),
            )
        })?;

    // 4. Role gate.
    let (maj_role, yc_role, admin_role) = state.discord.role_ids();
    let has_member_role = member
        .roles
        .iter()
        .any(|r| r == maj_role || r == yc_role);
    if !has_member_role {
        return Err(AppError::AccessDenied(
            "Your account does not hold a leaderboard member role".into(),
        ));
    }

    let is_admin = member
        .roles
        .iter()
        .any(|r| r == yc_role || r == admin_role);
    let access_level = if is_admin { ACCESS_ADMIN } else { ACCESS_USER };

    // 5. Mint the session token.
    let profile = SessionProfile {
        discord_id: user.id.clone(),
        username: user.username.clone(),
        global_name: user.global_name.clone(),
        avatar: user.avatar.clone(),
    };
    let (jwt, expires_at) =
        generate_session_token(&profile, access_level, &state.config.jwt, Utc::now())
            .map_err(|e| AppError::InternalError(format!("Token generation failed: {e}")))?;

    tracing::info!(discord_id = %user.id, access_level, "Session issued");

    Ok(Json(DiscordAuthResponse {
        jwt,
        user: UserInfo {
            discord_id: user.id,
            username: user.username,
            global_name: user.global_name,
            avatar: user.avatar,
        },
        access_level: access_level.to_string(),
        expires_at,
    }))
}
