use std::sync::Arc;

use eggboard_events::Notifier;
use eggboard_wonky::WonkyClient;

use crate::auth::discord::DiscordClient;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already
/// `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: eggboard_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Upstream player-data client.
    pub wonky: Arc<WonkyClient>,
    /// Identity provider client.
    pub discord: Arc<DiscordClient>,
    /// Operator notification dispatcher.
    pub notifier: Arc<Notifier>,
}
