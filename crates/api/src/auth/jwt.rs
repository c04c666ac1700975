//! Session token generation and verification.
//!
//! Session tokens are HS256-signed JWTs minted after a successful identity
//! exchange. The signing secret is shared with the database's policy
//! engine so row-level policies can evaluate the claims directly; it never
//! leaves the server side. Data endpoints trust the verified claims
//! instead of re-querying the identity provider on every request.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use eggboard_core::types::Timestamp;

use crate::config::JwtConfig;

/// Session lifetime: seven days.
const SESSION_EXPIRY_DAYS: i64 = 7;

/// Audience and database role claims expected by the policy engine.
const AUDIENCE: &str = "authenticated";

/// Claims embedded in every session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Issuer: `<issuer base>/auth/v1`.
    pub iss: String,
    /// Subject: the member's Discord id.
    pub sub: String,
    pub aud: String,
    /// Database role evaluated by row-level policies.
    pub role: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    pub email: String,
    pub phone: String,
    /// The member's Discord id, duplicated for policy convenience.
    pub discord_id: String,
    /// Access level: `"user"` or `"admin"`.
    pub access_level: String,
    pub app_metadata: AppMetadata,
    pub user_metadata: serde_json::Value,
}

/// Provider bookkeeping mirrored from the identity exchange.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppMetadata {
    pub provider: String,
    pub providers: Vec<String>,
}

/// Profile fields carried into `user_metadata`.
#[derive(Debug, Clone)]
pub struct SessionProfile {
    pub discord_id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
}

/// Generate an HS256 session token for the given member.
///
/// Returns the token and its expiration instant.
pub fn generate_session_token(
    profile: &SessionProfile,
    access_level: &str,
    config: &JwtConfig,
    now: Timestamp,
) -> Result<(String, i64), jsonwebtoken::errors::Error> {
    let iat = now.timestamp();
    let exp = iat + SESSION_EXPIRY_DAYS * 24 * 3600;

    let claims = SessionClaims {
        iss: format!("{}/auth/v1", config.issuer_base_url),
        sub: profile.discord_id.clone(),
        aud: AUDIENCE.to_string(),
        role: AUDIENCE.to_string(),
        exp,
        iat,
        email: String::new(),
        phone: String::new(),
        discord_id: profile.discord_id.clone(),
        access_level: access_level.to_string(),
        app_metadata: AppMetadata {
            provider: "discord".to_string(),
            providers: vec!["discord".to_string()],
        },
        user_metadata: serde_json::json!({
            "discord_id": profile.discord_id,
            "username": profile.username,
            "global_name": profile.global_name,
            "avatar": profile.avatar,
        }),
    };

    let token = encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;
    Ok((token, exp))
}

/// Verify and decode a session token, returning the embedded
/// [`SessionClaims`].
///
/// Validates the signature, expiration, and audience.
pub fn verify_session_token(
    token: &str,
    config: &JwtConfig,
) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[AUDIENCE]);

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            issuer_base_url: "http://localhost:3000".to_string(),
        }
    }

    fn profile() -> SessionProfile {
        SessionProfile {
            discord_id: "123456789".to_string(),
            username: "chickenmath".to_string(),
            global_name: Some("Chicken Math".to_string()),
            avatar: Some("abcdef".to_string()),
        }
    }

    #[test]
    fn test_generate_and_verify_session_token() {
        let config = test_config();
        let now = Utc::now();
        let (token, exp) = generate_session_token(&profile(), "admin", &config, now)
            .expect("token generation should succeed");

        let claims = verify_session_token(&token, &config).expect("verification should succeed");
        assert_eq!(claims.sub, "123456789");
        assert_eq!(claims.discord_id, "123456789");
        assert_eq!(claims.access_level, "admin");
        assert_eq!(claims.aud, "authenticated");
        assert_eq!(claims.role, "authenticated");
        assert_eq!(claims.iss, "http://localhost:3000/auth/v1");
        assert_eq!(claims.exp, exp);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
        assert_eq!(claims.app_metadata.provider, "discord");
        assert_eq!(claims.user_metadata["username"], "chickenmath");
    }

    #[test]
    fn test_expired_token_fails() {
        let config = test_config();

        // Minted eight days ago, so it expired a day ago -- well past the
        // default leeway.
        let now = Utc::now() - Duration::days(8);
        let (token, _) = generate_session_token(&profile(), "user", &config, now)
            .expect("token generation should succeed");

        let result = verify_session_token(&token, &config);
        assert!(result.is_err(), "expired token must fail verification");
    }

    #[test]
    fn test_different_secrets_fail() {
        let config_a = test_config();
        let config_b = JwtConfig {
            secret: "another-secret-entirely".to_string(),
            ..test_config()
        };

        let (token, _) = generate_session_token(&profile(), "user", &config_a, Utc::now())
            .expect("token generation should succeed");

        let result = verify_session_token(&token, &config_b);
        assert!(
            result.is_err(),
            "token signed with a different secret must fail"
        );
    }

    #[test]
    fn test_tampered_access_level_fails() {
        let config = test_config();
        let (token, _) = generate_session_token(&profile(), "user", &config, Utc::now())
            .expect("token generation should succeed");

        // Flip a character in the payload segment.
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let mut payload = parts[1].clone().into_bytes();
        payload[0] = if payload[0] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(payload).unwrap();
        let tampered = parts.join(".");

        assert!(verify_session_token(&tampered, &config).is_err());
    }
}
