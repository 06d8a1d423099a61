//! Engine integration tests
//!
//! End-to-end runs against the in-memory target. Heavy runs are `#[ignore]`d:
//! cargo test --test engine stress -- --ignored

#[path = "../common/mod.rs"]
mod common;

mod configuration;
mod execution;
mod retry;
mod timeseries_indexes;
