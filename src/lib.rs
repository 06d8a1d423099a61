//! fsmload - concurrent finite-state-machine workloads for black-box database testing
//!
//! A workload is a set of named states, each bound to an action that issues
//! commands against the system under test, plus a weighted transition policy.
//! The engine runs it on many threads at once so that interleaved mutations
//! (drop-and-recreate races, concurrent DDL) get exercised.
//!
//! # Quick Start
//!
//! ```ignore
//! use fsmload::{Workload, testing::MemoryTarget};
//!
//! let workload = Workload::builder()
//!     .state("create", |ctx| {
//!         let cmd = serde_json::json!({"create": ctx.target_name()});
//!         ctx.run_command("test", cmd.as_object().unwrap())?;
//!         Ok(())
//!     })
//!     .state_tolerating("drop", [26], |ctx| { /* ... */ Ok(()) })
//!     .uniform_transitions()
//!     .start_state("create")
//!     .thread_count(4)
//!     .iterations(100)
//!     .build()?;
//!
//! let report = workload.run(&MemoryTarget::new())?;
//! println!("{report}");
//! report.into_result()?;
//! ```
//!
//! # Architecture
//!
//! - [`fsmload_core`]: the result wrapper, retry tracking, and the
//!   [`CommandTarget`] seam
//! - [`fsmload_engine`]: states, transitions, the worker pool, and run reports

pub use fsmload_core::*;
pub use fsmload_engine::*;
