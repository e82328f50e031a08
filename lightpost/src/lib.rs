//! Aggregator internals, shared between the binary and integration tests.

pub mod config;
pub mod dispatch;
pub mod ingest;
pub mod poller;
