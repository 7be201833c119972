//! Event-sourced accounts and users.
//!
//! State is never stored directly: aggregates are rebuilt by replaying their
//! event history, and new events are appended under an optimistic
//! `(aggregate_id, version)` check.

pub mod config;
pub mod domain;
pub mod event_sourcing;
pub mod metrics;
pub mod utils;
