//! Session-token extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use eggboard_core::error::CoreError;
use eggboard_core::roles;
use eggboard_core::types::Timestamp;

use crate::auth::jwt::verify_session_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated principal extracted from a Bearer session token in the
/// `Authorization` header.
///
/// Use this as an extractor parameter in any handler that requires
/// authentication:
///
/// ```ignore
/// async fn my_handler(principal: Principal) -> AppResult<Json<()>> {
///     tracing::info!(subject = %principal.subject_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Principal {
    /// The member's Discord id (from `claims.discord_id`).
    pub subject_id: String,
    /// Access level: `"user"` or `"admin"`.
    pub access_level: String,
    /// When the session expires.
    pub expires_at: Timestamp,
}

impl Principal {
    /// Whether this principal has admin privileges.
    pub fn is_admin(&self) -> bool {
        roles::is_admin(&self.access_level)
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = verify_session_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Invalid expiration claim".into()))
        })?;

        Ok(Principal {
            subject_id: claims.discord_id,
            access_level: claims.access_level,
            expires_at,
        })
    }
}
