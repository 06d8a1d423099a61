//! Worker loop and run-wide cancellation.
//!
//! Each worker owns its cursor, its iteration counter, its generators and its
//! counters. The only state workers share is [`RunControl`]: a cancellation
//! flag checked at the top of every iteration, and the first-fatal slot.

use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};

use fsmload_core::{CommandTarget, ErrorCode, Fault};

use crate::context::ActionContext;
use crate::report::{FatalFault, WorkerExit, WorkerReport};
use crate::workload::Workload;

#[derive(Default)]
struct FatalSlot {
    first: Option<FatalFault>,
    suppressed: Vec<FatalFault>,
}

/// Cancellation flag plus the first-fatal slot, shared by all workers of a run.
#[derive(Default)]
pub(crate) struct RunControl {
    cancelled: AtomicBool,
    fatal: Mutex<FatalSlot>,
}

impl RunControl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Record a fatal fault and cancel the run. The first caller wins; later
    /// faults are kept as suppressed.
    pub(crate) fn record_fatal(&self, fatal: FatalFault) {
        {
            let mut slot = self.fatal.lock();
            if slot.first.is_none() {
                error!(target: "fsmload::engine", fatal = %fatal, "Fatal fault, cancelling workers");
                slot.first = Some(fatal);
            } else {
                debug!(target: "fsmload::engine", fatal = %fatal, "Suppressed fatal fault");
                slot.suppressed.push(fatal);
            }
        }
        self.cancel();
    }

    /// Record a fault that only fails the run if nothing else has.
    pub(crate) fn record_if_clean(&self, fatal: FatalFault) {
        let mut slot = self.fatal.lock();
        if slot.first.is_none() {
            error!(target: "fsmload::engine", fatal = %fatal, "Teardown failed");
            slot.first = Some(fatal);
        } else {
            slot.suppressed.push(fatal);
        }
    }

    pub(crate) fn into_faults(self) -> (Option<FatalFault>, Vec<FatalFault>) {
        let slot = self.fatal.into_inner();
        (slot.first, slot.suppressed)
    }
}

/// What a worker hands back at join time.
pub(crate) struct WorkerOutcome {
    pub(crate) report: WorkerReport,
    /// Invocations per state index
    pub(crate) invocations: Vec<u64>,
    /// Tolerated faults per state index, by code
    pub(crate) tolerated: Vec<FxHashMap<ErrorCode, u64>>,
}

/// Generators for one worker: one drives transitions, one is handed to actions.
///
/// Both derive from the run seed, on distinct streams, so the transition
/// sequence does not depend on how much randomness actions consume.
pub(crate) fn worker_rngs(seed: u64, worker_id: usize) -> (ChaCha8Rng, ChaCha8Rng) {
    let stream = (worker_id as u64) << 1;
    let mut transitions = ChaCha8Rng::seed_from_u64(seed);
    transitions.set_stream(stream);
    let mut actions = ChaCha8Rng::seed_from_u64(seed);
    actions.set_stream(stream | 1);
    (transitions, actions)
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "(non-string panic)".to_string()
    }
}

pub(crate) fn run_worker<D: Sync>(
    workload: &Workload<D>,
    target: &dyn CommandTarget,
    control: &RunControl,
    worker_id: usize,
    seed: u64,
) -> WorkerOutcome {
    let states = workload.states();
    let table = workload.table();
    let target_name = workload.targeting().target_for(worker_id);
    let (mut transition_rng, mut action_rng) = worker_rngs(seed, worker_id);

    let mut invocations = vec![0u64; states.len()];
    let mut tolerated: Vec<FxHashMap<ErrorCode, u64>> = vec![FxHashMap::default(); states.len()];
    let mut tolerated_total = 0u64;
    let mut completed = 0u64;
    let mut cursor = workload.start_index();
    let mut exit = WorkerExit::Completed;

    for iteration in 0..workload.iterations() {
        if control.is_cancelled() {
            exit = WorkerExit::Cancelled;
            break;
        }

        let state = &states[cursor];
        invocations[cursor] += 1;

        let mut ctx = ActionContext {
            target,
            target_name: &target_name,
            worker_id,
            iteration,
            state: state.name(),
            data: workload.data(),
            rng: &mut action_rng,
            retry: workload.retry_config(),
        };
        let result = catch_unwind(AssertUnwindSafe(|| state.invoke(&mut ctx)));

        let fault = match result {
            Ok(Ok(())) => None,
            Ok(Err(fault)) => Some(fault),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    target: "fsmload::worker",
                    worker = worker_id,
                    state = state.name(),
                    iteration,
                    "Action panicked: {}",
                    message
                );
                Some(Fault::panicked(message))
            }
        };

        if let Some(fault) = fault {
            if state.tolerated().tolerates(&fault) {
                warn!(
                    target: "fsmload::worker",
                    worker = worker_id,
                    state = state.name(),
                    iteration,
                    code = fault.code.as_i32(),
                    "Tolerated fault: {}",
                    fault
                );
                *tolerated[cursor].entry(fault.code).or_insert(0) += 1;
                tolerated_total += 1;
            } else {
                control.record_fatal(FatalFault {
                    worker: Some(worker_id),
                    state: Some(state.name().to_string()),
                    iteration,
                    fault,
                });
                exit = WorkerExit::Failed;
                break;
            }
        }

        completed += 1;
        let Some(next) = table.next(cursor, &mut transition_rng) else {
            // Only reachable states ever become the cursor.
            break;
        };
        debug!(
            target: "fsmload::worker",
            worker = worker_id,
            iteration,
            from = state.name(),
            to = states[next].name(),
            "Transition"
        );
        cursor = next;
    }

    WorkerOutcome {
        report: WorkerReport {
            worker_id,
            target: target_name,
            iterations_completed: completed,
            final_state: states[cursor].name().to_string(),
            exit,
            tolerated: tolerated_total,
        },
        invocations,
        tolerated,
    }
}
