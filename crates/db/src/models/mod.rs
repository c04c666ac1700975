//! Row models, one module per table family.

pub mod cache;
pub mod controller_state;
pub mod email_log;
pub mod exclusion;
pub mod snapshot;
