//! Core types and traits for fsmload
//!
//! This crate defines the pieces shared by every workload:
//! - Error: `Fault` (raised by the system under test) and `Error` (fsmload's own failures)
//! - Reply: response documents and the success predicate
//! - Outcome: a value-or-fault container with predicate-aware inspection
//! - Retry: bounded attempt/time iteration and `retry_until_ok`
//! - Traits: the `CommandTarget` seam to the system under test
//! - Types: read/write concern descriptors
//! - Testing: an in-memory `CommandTarget` with fault injection

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod outcome;
pub mod reply;
pub mod retry;
pub mod testing;
pub mod traits;
pub mod types;

pub use error::{Error, ErrorCode, Fault, Result};
pub use outcome::Outcome;
pub use reply::{Acknowledged, Document, Reply, ReplyStatus};
pub use retry::{retry_until_ok, RetryAttempt, RetryConfig, RetryIter, RetryTracker};
pub use traits::{command_name, CommandTarget};
pub use types::{Concern, ReadConcern, ReadConcernLevel, WriteAcknowledgement, WriteConcern};
