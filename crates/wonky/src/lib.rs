//! HTTP client for the wonky player-data provider.
//!
//! One operation: fetch the current player set as a list of records. A
//! non-2xx response, an empty array, or a non-array payload is a retryable
//! failure surfaced to the controller, which treats it as "no data" and
//! leaves cache and state untouched.

mod client;

pub use client::{WonkyClient, WonkyError};
