//! Request extractors: bearer authentication, role gates, and the
//! operator secret check.

pub mod auth;
pub mod rbac;
pub mod secret;
