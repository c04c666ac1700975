//! Eggboard API server library.
//!
//! Exposes the building blocks (config, state, error handling, auth, the
//! tick controller, routes) so integration tests and the binary entrypoint
//! can both access them.

pub mod auth;
pub mod background;
pub mod config;
pub mod controller;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
