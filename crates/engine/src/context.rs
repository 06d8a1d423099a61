//! Per-invocation action context
//!
//! Every action receives an [`ActionContext`] giving it the system under test,
//! its worker-scoped target identifier, the shared workload data, and a
//! random number generator private to the worker.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use fsmload_core::{
    retry_until_ok, Acknowledged, CommandTarget, Concern, Document, ErrorCode, Fault, Outcome,
    Reply, RetryAttempt, RetryConfig,
};

/// How target identifiers are assigned to workers.
///
/// The identifier is a hint for actions (typically a collection name); the
/// engine itself never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Targeting {
    /// Each worker gets `"{prefix}{worker_id}"`: disjoint targets
    PerWorker {
        /// Identifier prefix
        prefix: String,
    },
    /// Every worker gets the same identifier: overlapping targets
    Shared {
        /// The shared identifier
        name: String,
    },
}

impl Default for Targeting {
    fn default() -> Self {
        Targeting::PerWorker {
            prefix: "fsmload_".to_string(),
        }
    }
}

impl Targeting {
    /// Identifier for `worker_id`.
    pub fn target_for(&self, worker_id: usize) -> String {
        match self {
            Targeting::PerWorker { prefix } => format!("{prefix}{worker_id}"),
            Targeting::Shared { name } => name.clone(),
        }
    }
}

/// What an action can see during one invocation.
pub struct ActionContext<'a, D> {
    pub(crate) target: &'a dyn CommandTarget,
    pub(crate) target_name: &'a str,
    pub(crate) worker_id: usize,
    pub(crate) iteration: u64,
    pub(crate) state: &'a str,
    pub(crate) data: &'a D,
    pub(crate) rng: &'a mut ChaCha8Rng,
    pub(crate) retry: &'a RetryConfig,
}

impl<'a, D> ActionContext<'a, D> {
    /// The system under test
    pub fn target(&self) -> &'a dyn CommandTarget {
        self.target
    }

    /// This worker's target identifier
    pub fn target_name(&self) -> &'a str {
        self.target_name
    }

    /// 0-based worker id
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// 0-based iteration of this worker
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Name of the state being executed
    pub fn state(&self) -> &'a str {
        self.state
    }

    /// Data shared by all workers
    pub fn data(&self) -> &'a D {
        self.data
    }

    /// Random number generator private to this worker.
    ///
    /// Seeded from the run seed, so actions that draw from it replay with the
    /// seed. It is separate from the generator that samples transitions.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut *self.rng
    }

    /// Retry policy configured for the run
    pub fn retry_config(&self) -> &'a RetryConfig {
        self.retry
    }

    /// Run `command` against `db` with no read/write concern.
    ///
    /// A reply that fails the success predicate comes back as the [`Fault`]
    /// it describes, so it is subject to the state's tolerated codes like a
    /// raised fault.
    pub fn run_command(&self, db: &str, command: &Document) -> Result<Reply, Fault> {
        self.target.run_command(db, command, None)?.into_checked()
    }

    /// Run `command` against `db` with an explicit concern, checking the reply.
    pub fn run_command_with(
        &self,
        db: &str,
        command: &Document,
        concern: &Concern,
    ) -> Result<Reply, Fault> {
        self.target.run_command(db, command, Some(concern))?.into_checked()
    }

    /// Run `command` and return whatever reply comes back, failed or not.
    ///
    /// Only raised faults are `Err`. Use this when the action inspects the
    /// reply itself (e.g. to read `writeErrors`).
    pub fn run_command_raw(
        &self,
        db: &str,
        command: &Document,
        concern: Option<&Concern>,
    ) -> Result<Reply, Fault> {
        self.target.run_command(db, command, concern)
    }

    /// Call `op` under the run's retry policy until it is acknowledged.
    ///
    /// `None` when the policy allowed no attempts.
    pub fn retry<T, F>(&self, op: F) -> Option<Outcome<T>>
    where
        T: Acknowledged,
        F: FnMut(&RetryAttempt) -> Outcome<T>,
    {
        retry_until_ok(self.retry, op)
    }

    /// Run `command` until it succeeds or the retry policy is exhausted.
    ///
    /// Returns the successful reply, or the fault of the last attempt (a raised
    /// fault, or the fault described by a failed reply).
    pub fn retry_command(&self, db: &str, command: &Document) -> Result<Reply, Fault> {
        let outcome = self.retry(|_| Outcome::evaluate(|| self.run_command_raw(db, command, None)));
        match outcome {
            Some(Outcome::Value(reply)) => reply.into_checked(),
            Some(Outcome::Fault(fault)) => Err(fault),
            None => Err(Fault::new(ErrorCode::UNKNOWN, "retry policy allowed no attempts")),
        }
    }
}
