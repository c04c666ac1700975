use eggboard_core::decision::DecisionConfig;

/// Server configuration loaded from environment variables.
///
/// All fields besides the secrets have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Session token configuration (secret, issuer).
    pub jwt: JwtConfig,
    /// Identity provider configuration.
    pub discord: DiscordConfig,
    /// Upstream player-data endpoint URL.
    pub wonky_endpoint_url: String,
    /// Preshared operator token for `x-secret-token` authentication.
    pub secret_token: String,
    /// Minutes before the cache freshness marker counts as stale
    /// (default: `15`).
    pub cache_duration_minutes: i64,
    /// Snapshot decision engine tunables.
    pub decision: DecisionConfig,
    /// Whether the in-process tick scheduler runs (default: `false`;
    /// deployments with an external scheduler leave this off).
    pub scheduler_enabled: bool,
}

/// Configuration for session token generation and verification.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret, shared with the database's policy engine.
    pub secret: String,
    /// Base URL used to form the `iss` claim (`<base>/auth/v1`).
    pub issuer_base_url: String,
}

/// Identity provider (Discord) configuration.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub client_id: String,
    pub client_secret: String,
    /// The guild whose membership gates access.
    pub guild_id: String,
    /// Role granting regular member access.
    pub maj_role_id: String,
    /// Role granting member access and admin privileges.
    pub yc_role_id: String,
    /// Role granting admin privileges on top of member access.
    pub admin_role_id: String,
}

/// Default cache staleness bound in minutes.
const DEFAULT_CACHE_DURATION_MINUTES: i64 = 15;

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Required | Default                 |
    /// |--------------------------|----------|-------------------------|
    /// | `HOST`                   | no       | `0.0.0.0`               |
    /// | `PORT`                   | no       | `3000`                  |
    /// | `CORS_ORIGINS`           | no       | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | no       | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`  | no       | `30`                    |
    /// | `JWT_SECRET`             | **yes**  | --                      |
    /// | `AUTH_ISSUER_URL`        | no       | `http://localhost:3000` |
    /// | `DISCORD_CLIENT_ID`      | **yes**  | --                      |
    /// | `DISCORD_CLIENT_SECRET`  | **yes**  | --                      |
    /// | `EGGINC_GUILD`           | **yes**  | --                      |
    /// | `EGGINC_MAJ_ROLE`        | **yes**  | --                      |
    /// | `EGGINC_YC_ROLE`         | **yes**  | --                      |
    /// | `EGGINC_WONKY_LEADER_ROLE` | **yes** | --                     |
    /// | `WONKY_ENDPOINT_URL`     | **yes**  | --                      |
    /// | `SECRET_TOKEN`           | **yes**  | --                      |
    /// | `CACHE_DURATION_MINUTES` | no       | `15`                    |
    /// | `CRON_SCHEDULER_ENABLED` | no       | `false`                 |
    ///
    /// Decision engine tunables (`SYNC_WINDOW_MINUTES`, `COOLDOWN_HOURS`,
    /// `PARTIAL_SYNC_THRESHOLD`, `PARTIAL_SYNC_RETRY_ATTEMPTS`,
    /// `CRON_INTERVAL_MINUTES`, `PENDING_SYNC_STALE_HOURS`,
    /// `ALERT_THRESHOLD_DAYS`, `ALERT_COOLDOWN_HOURS`) all default to the
    /// production values in [`DecisionConfig::default`].
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or unparseable; we want
    /// misconfiguration to fail fast at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let cache_duration_minutes: i64 = std::env::var("CACHE_DURATION_MINUTES")
            .unwrap_or_else(|_| DEFAULT_CACHE_DURATION_MINUTES.to_string())
            .parse()
            .expect("CACHE_DURATION_MINUTES must be a valid i64");

        let scheduler_enabled = std::env::var("CRON_SCHEDULER_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            discord: DiscordConfig::from_env(),
            wonky_endpoint_url: require_env("WONKY_ENDPOINT_URL"),
            secret_token: require_env("SECRET_TOKEN"),
            cache_duration_minutes,
            decision: decision_config_from_env(),
            scheduler_enabled,
        }
    }
}

impl JwtConfig {
    /// Load session token configuration from the environment.
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret = require_env("JWT_SECRET");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let issuer_base_url =
            std::env::var("AUTH_ISSUER_URL").unwrap_or_else(|_| "http://localhost:3000".into());

        Self {
            secret,
            issuer_base_url,
        }
    }
}

impl DiscordConfig {
    /// Load identity provider configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            client_id: require_env("DISCORD_CLIENT_ID"),
            client_secret: require_env("DISCORD_CLIENT_SECRET"),
            guild_id: require_env("EGGINC_GUILD"),
            maj_role_id: require_env("EGGINC_MAJ_ROLE"),
            yc_role_id: require_env("EGGINC_YC_ROLE"),
            admin_role_id: require_env("EGGINC_WONKY_LEADER_ROLE"),
        }
    }
}

/// Decision engine tunables, overridable per value from the environment.
fn decision_config_from_env() -> DecisionConfig {
    let defaults = DecisionConfig::default();
    DecisionConfig {
        sync_window_minutes: env_or("SYNC_WINDOW_MINUTES", defaults.sync_window_minutes),
        cooldown_hours: env_or("COOLDOWN_HOURS", defaults.cooldown_hours),
        partial_sync_threshold: env_or("PARTIAL_SYNC_THRESHOLD", defaults.partial_sync_threshold),
        partial_sync_retry_attempts: env_or(
            "PARTIAL_SYNC_RETRY_ATTEMPTS",
            defaults.partial_sync_retry_attempts,
        ),
        cron_interval_minutes: env_or("CRON_INTERVAL_MINUTES", defaults.cron_interval_minutes),
        pending_sync_stale_hours: env_or(
            "PENDING_SYNC_STALE_HOURS",
            defaults.pending_sync_stale_hours,
        ),
        alert_threshold_days: env_or("ALERT_THRESHOLD_DAYS", defaults.alert_threshold_days),
        alert_cooldown_hours: env_or("ALERT_COOLDOWN_HOURS", defaults.alert_cooldown_hours),
    }
}

fn require_env(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set in the environment"))
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
