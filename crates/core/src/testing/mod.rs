//! Testing utilities
//!
//! - **MemoryTarget**: an in-memory [`CommandTarget`](crate::CommandTarget)
//!   with a namespace catalog and scripted fault injection
//!
//! # Example
//!
//! ```ignore
//! use fsmload_core::testing::{FaultPlan, MemoryTarget};
//!
//! let target = MemoryTarget::new();
//! target.inject("insert", FaultPlan::Once(Fault::new(91, "shutdown in progress")));
//! ```

mod memory_target;

pub use memory_target::{codes, FaultPlan, MemoryTarget};
