//! Role-based access control extractors.
//!
//! Each extractor wraps [`Principal`] and rejects requests whose access
//! level does not meet the minimum requirement, enforcing authorization at
//! the type level.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use eggboard_core::error::CoreError;

use super::auth::Principal;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` access level. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(principal): RequireAdmin) -> AppResult<Json<()>> {
///     // principal is guaranteed to be an admin here
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub Principal);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = Principal::from_request_parts(parts, state).await?;
        if !principal.is_admin() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin access required".into(),
            )));
        }
        Ok(RequireAdmin(principal))
    }
}
