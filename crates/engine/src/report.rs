//! Run reports
//!
//! A [`RunReport`] is returned by every workload run, successful or not. It
//! carries the overall outcome, the first fatal fault (with any later ones
//! recorded as suppressed), per-state invocation and tolerated-fault counts,
//! and one entry per worker.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use fsmload_core::{Error, ErrorCode, Fault, Result};

/// A fault that aborted (or would have aborted) the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FatalFault {
    /// Worker that raised it; `None` for setup/teardown hooks
    pub worker: Option<usize>,
    /// State whose action raised it; `None` for hooks
    pub state: Option<String>,
    /// Iteration of the worker at which it was raised
    pub iteration: u64,
    /// The fault
    pub fault: Fault,
}

impl fmt::Display for FatalFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.worker, &self.state) {
            (Some(worker), Some(state)) => write!(
                f,
                "worker {worker}, state '{state}', iteration {}: {}",
                self.iteration, self.fault
            ),
            (Some(worker), None) => write!(f, "worker {worker}: {}", self.fault),
            (None, _) => write!(f, "workload hook: {}", self.fault),
        }
    }
}

/// Per-state counters, aggregated over all workers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateStats {
    /// Action invocations, including ones that raised
    pub invocations: u64,
    /// Tolerated faults raised by the action
    pub tolerated: u64,
    /// Tolerated faults by error code
    pub tolerated_by_code: BTreeMap<ErrorCode, u64>,
}

/// How a worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkerExit {
    /// Iteration budget exhausted
    Completed,
    /// Stopped at an iteration boundary after cancellation
    Cancelled,
    /// Raised a fatal fault
    Failed,
}

/// Per-worker summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    /// 0-based worker id
    pub worker_id: usize,
    /// Target identifier handed to the worker's actions
    pub target: String,
    /// Iterations whose action returned normally or with a tolerated fault
    pub iterations_completed: u64,
    /// Cursor state when the worker stopped
    pub final_state: String,
    /// How the worker stopped
    pub exit: WorkerExit,
    /// Tolerated faults raised by this worker
    pub tolerated: u64,
}

/// Result of one workload run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Seed the workers' generators were derived from
    pub seed: u64,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration, hooks included
    pub wall_time: Duration,
    /// Configured worker count
    pub thread_count: usize,
    /// Configured iterations per worker
    pub iterations: u64,
    /// First fatal fault, if any
    pub fatal: Option<FatalFault>,
    /// Fatal faults recorded after the first
    pub suppressed: Vec<FatalFault>,
    /// Counters per registered state
    pub states: BTreeMap<String, StateStats>,
    /// One entry per worker that was started
    pub workers: Vec<WorkerReport>,
}

impl RunReport {
    /// True if no fatal fault occurred and every worker completed its budget.
    pub fn is_success(&self) -> bool {
        self.fatal.is_none()
            && self
                .workers
                .iter()
                .all(|w| w.exit == WorkerExit::Completed)
    }

    /// Action invocations across all states
    pub fn total_invocations(&self) -> u64 {
        self.states.values().map(|s| s.invocations).sum()
    }

    /// Tolerated faults across all states
    pub fn total_tolerated(&self) -> u64 {
        self.states.values().map(|s| s.tolerated).sum()
    }

    /// Invocations of one state (0 if unknown)
    pub fn invocations_of(&self, state: &str) -> u64 {
        self.states.get(state).map(|s| s.invocations).unwrap_or(0)
    }

    /// The first fatal fault as an error, leaving the report intact.
    ///
    /// Use this when the suppressed faults and per-state counts are still
    /// needed after the failure, e.g. to print the report before propagating.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fatal`] carrying a copy of the first fatal fault.
    pub fn check(&self) -> Result<()> {
        match &self.fatal {
            Some(fatal) => Err(Error::Fatal {
                worker: fatal.worker,
                state: fatal.state.clone(),
                fault: fatal.fault.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Convert into an error at the boundary where the caller wants `?`.
    ///
    /// The report is dropped on failure; call [`check`](Self::check) first
    /// when its diagnostics matter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fatal`] carrying the first fatal fault.
    pub fn into_result(self) -> Result<RunReport> {
        match self.fatal {
            Some(FatalFault {
                worker,
                state,
                fault,
                ..
            }) => Err(Error::Fatal {
                worker,
                state,
                fault,
            }),
            None => Ok(self),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Workload Report ===")?;
        writeln!(f, "Run: {}", self.run_id)?;
        writeln!(f, "Started: {}", self.started_at.to_rfc3339())?;
        writeln!(f, "Seed: {}", self.seed)?;
        writeln!(f, "Threads: {}", self.thread_count)?;
        writeln!(f, "Iterations per thread: {}", self.iterations)?;
        writeln!(f, "Wall Time: {:?}", self.wall_time)?;
        writeln!(
            f,
            "Outcome: {}",
            if self.is_success() { "SUCCESS" } else { "FAILED" }
        )?;
        writeln!(f)?;
        writeln!(f, "Invocations: {}", self.total_invocations())?;
        writeln!(f, "Tolerated faults: {}", self.total_tolerated())?;

        if !self.states.is_empty() {
            writeln!(f)?;
            writeln!(f, "=== States ===")?;
            for (name, stats) in &self.states {
                write!(f, "  {}: {} invocations", name, stats.invocations)?;
                if stats.tolerated > 0 {
                    let codes: Vec<String> = stats
                        .tolerated_by_code
                        .iter()
                        .map(|(code, n)| format!("{code}x{n}"))
                        .collect();
                    write!(f, ", {} tolerated [{}]", stats.tolerated, codes.join(", "))?;
                }
                writeln!(f)?;
            }
        }

        if let Some(ref fatal) = self.fatal {
            writeln!(f)?;
            writeln!(f, "=== Fatal Fault ===")?;
            writeln!(f, "  {}", fatal)?;
            if !self.suppressed.is_empty() {
                writeln!(f, "Suppressed: {}", self.suppressed.len())?;
                for s in &self.suppressed {
                    writeln!(f, "  - {}", s)?;
                }
            }
        }

        let stopped: Vec<&WorkerReport> = self
            .workers
            .iter()
            .filter(|w| w.exit != WorkerExit::Completed)
            .collect();
        if !stopped.is_empty() {
            writeln!(f)?;
            writeln!(f, "=== Stopped Workers ===")?;
            for w in stopped {
                writeln!(
                    f,
                    "  worker {} ({:?}) after {} iterations in '{}'",
                    w.worker_id, w.exit, w.iterations_completed, w.final_state
                )?;
            }
        }

        Ok(())
    }
}
