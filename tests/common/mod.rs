//! Shared test utilities for the integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::Once;

pub use fsmload::testing::{codes, FaultPlan, MemoryTarget};
pub use fsmload::{
    ActionContext, CommandTarget, Distribution, Document, ErrorCode, Fault, Reply, RunReport,
    Targeting, Transitions, WorkerExit, Workload, WorkloadBuilder, WorkloadSettings,
};
pub use serde_json::json;

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Only warnings and errors are printed so tolerated faults stay visible
/// without drowning the output in per-transition debug lines.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::WARN)
            .try_init();
    });
}

// ============================================================================
// Helpers
// ============================================================================

/// Build a command document from a JSON object literal.
pub fn cmd(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(doc) => doc,
        other => panic!("command must be a JSON object, got {other}"),
    }
}

/// An action that does nothing.
pub fn noop<D>(_ctx: &mut ActionContext<'_, D>) -> Result<(), Fault> {
    Ok(())
}

/// Run a command built inline; a failed reply comes back as its fault.
pub fn run_checked<D>(ctx: &ActionContext<'_, D>, db: &str, command: Document) -> Result<Reply, Fault> {
    ctx.run_command(db, &command)
}

/// Uniform A/B workload over no-op actions.
pub fn ab_workload(thread_count: usize, iterations: u64) -> Workload {
    Workload::builder()
        .state("A", noop)
        .state("B", noop)
        .uniform_transitions()
        .start_state("A")
        .thread_count(thread_count)
        .iterations(iterations)
        .build()
        .unwrap()
}

/// Panic with the report attached if the run failed.
pub fn assert_success(report: &RunReport) {
    assert!(report.is_success(), "run failed:\n{}", report);
}
