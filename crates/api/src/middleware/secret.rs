//! Preshared operator token check.
//!
//! Operator tooling authenticates with an `x-secret-token` header instead
//! of a session token. The comparison is constant-time.

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

/// Header carrying the preshared operator token.
pub const SECRET_TOKEN_HEADER: &str = "x-secret-token";

/// Header marking an internal call from the tick controller.
pub const INTERNAL_CALL_HEADER: &str = "x-internal-call";

/// Whether the request carries the expected operator token.
pub fn operator_token_matches(headers: &HeaderMap, expected: &str) -> bool {
    let Some(provided) = headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Whether the request is flagged as an internal controller call.
pub fn is_internal_call(headers: &HeaderMap) -> bool {
    headers
        .get(INTERNAL_CALL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "true")
        .unwrap_or(false)
}
