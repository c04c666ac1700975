//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod cache_repo;
pub mod controller_state_repo;
pub mod email_log_repo;
pub mod excluded_player_repo;
pub mod snapshot_repo;

pub use cache_repo::CacheRepo;
pub use controller_state_repo::{ControllerStateRepo, ControllerStateUpdate};
pub use email_log_repo::EmailLogRepo;
pub use excluded_player_repo::ExcludedPlayerRepo;
pub use snapshot_repo::SnapshotRepo;
