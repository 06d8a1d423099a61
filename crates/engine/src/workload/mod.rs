//! Validated workloads and the run loop
//!
//! A [`Workload`] is immutable once built: states, the compiled transition
//! table and the run knobs are shared read-only by every worker, so no locking
//! is needed around them. [`Workload::run`] may be called repeatedly; each call
//! is an independent run with its own seed and report.

mod builder;
pub mod config;

pub use builder::WorkloadBuilder;
pub use config::{RetrySettings, WorkloadSettings, CONFIG_FILE_NAME};

use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

use fsmload_core::{CommandTarget, Fault, Result, RetryConfig};

use crate::context::Targeting;
use crate::report::{FatalFault, RunReport, StateStats, WorkerExit, WorkerReport};
use crate::state::State;
use crate::transitions::TransitionTable;
use crate::worker::{panic_message, run_worker, RunControl, WorkerOutcome};

/// Setup/teardown hook: runs on the calling thread with the target and the
/// shared data.
pub type Hook<D> =
    Box<dyn Fn(&dyn CommandTarget, &D) -> std::result::Result<(), Fault> + Send + Sync>;

/// A validated, runnable workload.
pub struct Workload<D = ()> {
    pub(crate) states: Vec<State<D>>,
    pub(crate) table: TransitionTable,
    pub(crate) start: usize,
    pub(crate) thread_count: usize,
    pub(crate) iterations: u64,
    pub(crate) seed: Option<u64>,
    pub(crate) targeting: Targeting,
    pub(crate) retry: RetryConfig,
    pub(crate) data: D,
    pub(crate) setup: Option<Hook<D>>,
    pub(crate) teardown: Option<Hook<D>>,
}

impl Workload<()> {
    /// Start building a workload with no shared data.
    pub fn builder() -> WorkloadBuilder<()> {
        WorkloadBuilder::new()
    }
}

impl<D> Workload<D> {
    /// Start building a workload whose actions share `data`.
    pub fn builder_with_data(data: D) -> WorkloadBuilder<D> {
        WorkloadBuilder::with_data(data)
    }

    /// Registered state names, in registration order
    pub fn state_names(&self) -> Vec<&str> {
        self.states.iter().map(State::name).collect()
    }

    /// Name of the start state
    pub fn start_state(&self) -> &str {
        self.states[self.start].name()
    }

    /// Number of workers per run
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Iterations per worker
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Pinned seed, if any
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Target identifier assignment
    pub fn targeting(&self) -> &Targeting {
        &self.targeting
    }

    /// Retry policy handed to actions
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Shared data
    pub fn data(&self) -> &D {
        &self.data
    }

    /// Normalized next-state probabilities for `state`.
    ///
    /// `None` for unknown states and for states unreachable from the start.
    pub fn transition_probabilities(&self, state: &str) -> Option<Vec<(&str, f64)>> {
        self.table.probabilities(state)
    }

    pub(crate) fn states(&self) -> &[State<D>] {
        &self.states
    }

    pub(crate) fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub(crate) fn start_index(&self) -> usize {
        self.start
    }
}

impl<D: Sync> Workload<D> {
    /// Run the workload against `target` and wait for every worker to stop.
    ///
    /// Fatal faults do not surface as `Err`: they are recorded in the returned
    /// report (use [`RunReport::into_result`] to turn one into an error).
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if a worker thread could not be spawned. Workers
    /// that did start are cancelled and joined first, and teardown still runs.
    pub fn run(&self, target: &dyn CommandTarget) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let seed = self.seed.unwrap_or_else(rand::random);
        let started_at = Utc::now();
        let start = Instant::now();
        let control = RunControl::new();

        info!(
            target: "fsmload::engine",
            run_id = %run_id,
            seed,
            threads = self.thread_count,
            iterations = self.iterations,
            start_state = self.start_state(),
            "Starting workload run"
        );

        let setup_ok = match &self.setup {
            Some(hook) => match invoke_hook(hook, target, &self.data) {
                Ok(()) => true,
                Err(fault) => {
                    control.record_fatal(FatalFault {
                        worker: None,
                        state: None,
                        iteration: 0,
                        fault,
                    });
                    false
                }
            },
            None => true,
        };

        let mut spawn_error = None;
        let outcomes = if setup_ok {
            let (outcomes, err) = self.run_workers(target, &control, seed);
            spawn_error = err;
            outcomes
        } else {
            Vec::new()
        };

        if let Some(hook) = &self.teardown {
            if let Err(fault) = invoke_hook(hook, target, &self.data) {
                control.record_if_clean(FatalFault {
                    worker: None,
                    state: None,
                    iteration: 0,
                    fault,
                });
            }
        }

        if let Some(err) = spawn_error {
            return Err(err.into());
        }

        let report = self.assemble_report(run_id, seed, started_at, start, control, outcomes);
        info!(
            target: "fsmload::engine",
            run_id = %run_id,
            success = report.is_success(),
            invocations = report.total_invocations(),
            tolerated = report.total_tolerated(),
            wall_ms = report.wall_time.as_millis() as u64,
            "Workload run finished"
        );
        Ok(report)
    }

    /// Spawn one named thread per worker and join them all.
    fn run_workers(
        &self,
        target: &dyn CommandTarget,
        control: &RunControl,
        seed: u64,
    ) -> (Vec<WorkerOutcome>, Option<std::io::Error>) {
        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.thread_count);
            let mut spawn_error = None;

            for worker_id in 0..self.thread_count {
                let spawned = std::thread::Builder::new()
                    .name(format!("fsmload-worker-{}", worker_id))
                    .spawn_scoped(scope, move || {
                        run_worker(self, target, control, worker_id, seed)
                    });
                match spawned {
                    Ok(handle) => handles.push((worker_id, handle)),
                    Err(e) => {
                        control.cancel();
                        spawn_error = Some(e);
                        break;
                    }
                }
            }

            let outcomes = handles
                .into_iter()
                .map(|(worker_id, handle)| match handle.join() {
                    Ok(outcome) => outcome,
                    Err(payload) => self.lost_worker(worker_id, control, panic_message(payload.as_ref())),
                })
                .collect();
            (outcomes, spawn_error)
        })
    }

    /// Outcome for a worker thread that died outside an action.
    fn lost_worker(&self, worker_id: usize, control: &RunControl, message: String) -> WorkerOutcome {
        control.record_fatal(FatalFault {
            worker: Some(worker_id),
            state: None,
            iteration: 0,
            fault: Fault::panicked(message),
        });
        WorkerOutcome {
            report: WorkerReport {
                worker_id,
                target: self.targeting.target_for(worker_id),
                iterations_completed: 0,
                final_state: self.start_state().to_string(),
                exit: WorkerExit::Failed,
                tolerated: 0,
            },
            invocations: vec![0; self.states.len()],
            tolerated: vec![Default::default(); self.states.len()],
        }
    }

    fn assemble_report(
        &self,
        run_id: Uuid,
        seed: u64,
        started_at: chrono::DateTime<Utc>,
        start: Instant,
        control: RunControl,
        outcomes: Vec<WorkerOutcome>,
    ) -> RunReport {
        let mut per_state: Vec<StateStats> = vec![StateStats::default(); self.states.len()];
        let mut workers = Vec::with_capacity(outcomes.len());

        for outcome in outcomes {
            for (idx, count) in outcome.invocations.iter().enumerate() {
                per_state[idx].invocations += count;
            }
            for (idx, codes) in outcome.tolerated.iter().enumerate() {
                for (code, count) in codes {
                    per_state[idx].tolerated += count;
                    *per_state[idx].tolerated_by_code.entry(*code).or_insert(0) += count;
                }
            }
            workers.push(outcome.report);
        }

        let states: BTreeMap<String, StateStats> = self
            .states
            .iter()
            .zip(per_state)
            .map(|(state, stats)| (state.name().to_string(), stats))
            .collect();
        let (fatal, suppressed) = control.into_faults();

        RunReport {
            run_id,
            seed,
            started_at,
            wall_time: start.elapsed(),
            thread_count: self.thread_count,
            iterations: self.iterations,
            fatal,
            suppressed,
            states,
            workers,
        }
    }
}

fn invoke_hook<D>(
    hook: &Hook<D>,
    target: &dyn CommandTarget,
    data: &D,
) -> std::result::Result<(), Fault> {
    catch_unwind(AssertUnwindSafe(|| hook(target, data)))
        .unwrap_or_else(|payload| Err(Fault::panicked(panic_message(payload.as_ref()))))
}

impl<D> fmt::Debug for Workload<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workload")
            .field("states", &self.state_names())
            .field("start_state", &self.start_state())
            .field("thread_count", &self.thread_count)
            .field("iterations", &self.iterations)
            .field("seed", &self.seed)
            .field("targeting", &self.targeting)
            .finish_non_exhaustive()
    }
}
