//! Agent internals, shared between the binary and integration tests.

pub mod actions;
pub mod collect;
pub mod commands;
pub mod config;
pub mod metric_server;
