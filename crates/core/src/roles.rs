//! Access levels carried in session tokens.
//!
//! There are exactly two: regular members see the leaderboard with
//! sensitive columns masked, admins see everything and may delete
//! snapshots.

/// Regular member access.
pub const ACCESS_USER: &str = "user";

/// Administrative access (full columns, snapshot deletion).
pub const ACCESS_ADMIN: &str = "admin";

/// Returns true if the given access level grants admin privileges.
pub fn is_admin(access_level: &str) -> bool {
    access_level == ACCESS_ADMIN
}
