//! Amity Gateway library surface.
//!
//! Exposed so integration tests can drive the HTTP sidecar and connection
//! plumbing without going through the binary.

pub mod config;
pub mod handler;
pub mod http;
pub mod metrics;
pub mod rate_limit;
pub mod registry;
