//! Write paths for the two database surfaces: the mutable current-state
//! cache and the append-only snapshot log.

pub mod cache_writer;
pub mod snapshot_writer;
