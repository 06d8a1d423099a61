//! Concurrent FSM workload engine for fsmload
//!
//! This crate drives randomized, concurrent exercise of a system under test:
//! - State: a named action plus its tolerated-fault allow-list
//! - Transitions: weighted next-state distributions, validated and compiled
//! - Workload: builder, validation, TOML settings, and the run loop
//! - Worker: per-thread cursor, private RNGs, cooperative cancellation
//! - Report: per-state and per-worker diagnostics of a run
//!
//! Workers share only the [`CommandTarget`](fsmload_core::CommandTarget) and
//! the read-only workload. Interleavings between workers are unconstrained.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod report;
pub mod state;
pub mod transitions;
mod worker;
pub mod workload;

pub use context::{ActionContext, Targeting};
pub use report::{FatalFault, RunReport, StateStats, WorkerExit, WorkerReport};
pub use state::{Action, State, ToleratedFaults};
pub use transitions::{Distribution, TransitionTable, Transitions};
pub use workload::{
    Hook, RetrySettings, Workload, WorkloadBuilder, WorkloadSettings, CONFIG_FILE_NAME,
};
