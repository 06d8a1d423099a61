//! Workload builder for fluent configuration
//!
//! Collects states, the transition policy and the run knobs, and validates
//! everything in [`WorkloadBuilder::build`] before a single worker can start.

use rustc_hash::FxHashSet;

use fsmload_core::{CommandTarget, Error, ErrorCode, Fault, Result, RetryConfig};

use super::config::WorkloadSettings;
use super::{Hook, Workload};
use crate::context::{ActionContext, Targeting};
use crate::state::{State, ToleratedFaults};
use crate::transitions::{TransitionTable, Transitions};

enum TransitionPolicy {
    Explicit(Transitions),
    Uniform,
}

/// Builder for [`Workload`].
///
/// # Example
///
/// ```ignore
/// use fsmload_engine::Workload;
///
/// let workload = Workload::builder()
///     .state("insert", |ctx| { /* ... */ Ok(()) })
///     .state_tolerating("drop", [26], |ctx| { /* ... */ Ok(()) })
///     .uniform_transitions()
///     .start_state("insert")
///     .thread_count(4)
///     .iterations(100)
///     .build()?;
/// ```
pub struct WorkloadBuilder<D = ()> {
    states: Vec<State<D>>,
    transitions: Option<TransitionPolicy>,
    start_state: Option<String>,
    thread_count: usize,
    iterations: u64,
    seed: Option<u64>,
    targeting: Targeting,
    retry: RetryConfig,
    data: D,
    setup: Option<Hook<D>>,
    teardown: Option<Hook<D>>,
}

impl WorkloadBuilder<()> {
    /// Builder with no shared data and default settings.
    pub fn new() -> Self {
        Self::with_data(())
    }
}

impl Default for WorkloadBuilder<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> WorkloadBuilder<D> {
    /// Builder whose actions share `data`.
    ///
    /// Workers only ever see `&D`. Anything they mutate must be safe under
    /// unordered concurrent access (atomics, or a lock inside `D`).
    pub fn with_data(data: D) -> Self {
        let defaults = WorkloadSettings::default();
        Self {
            states: Vec::new(),
            transitions: None,
            start_state: None,
            thread_count: defaults.thread_count,
            iterations: defaults.iterations,
            seed: None,
            targeting: Targeting::default(),
            retry: defaults.retry_config(),
            data,
            setup: None,
            teardown: None,
        }
    }

    /// Register a state whose action tolerates no faults.
    pub fn state<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut ActionContext<'_, D>) -> std::result::Result<(), Fault> + Send + Sync + 'static,
    {
        self.states.push(State::new(name, action));
        self
    }

    /// Register a state whose action may raise any of `codes` without failing
    /// the run.
    pub fn state_tolerating<I, C, F>(mut self, name: impl Into<String>, codes: I, action: F) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ErrorCode>,
        F: Fn(&mut ActionContext<'_, D>) -> std::result::Result<(), Fault> + Send + Sync + 'static,
    {
        self.states
            .push(State::new(name, action).tolerating(ToleratedFaults::of(codes)));
        self
    }

    /// Register a prebuilt state.
    pub fn add_state(mut self, state: State<D>) -> Self {
        self.states.push(state);
        self
    }

    /// Use an explicit transition policy.
    pub fn transitions(mut self, transitions: Transitions) -> Self {
        self.transitions = Some(TransitionPolicy::Explicit(transitions));
        self
    }

    /// Every state moves to every registered state with equal weight.
    ///
    /// Resolved at build time, so states registered afterwards are included.
    pub fn uniform_transitions(mut self) -> Self {
        self.transitions = Some(TransitionPolicy::Uniform);
        self
    }

    /// State every worker starts in (default: the first registered state).
    pub fn start_state(mut self, name: impl Into<String>) -> Self {
        self.start_state = Some(name.into());
        self
    }

    /// Number of concurrent workers.
    pub fn thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Iterations per worker.
    pub fn iterations(mut self, iterations: u64) -> Self {
        self.iterations = iterations;
        self
    }

    /// Pin the seed so every worker replays the same transition sequence.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// How target identifiers are assigned to workers.
    pub fn targeting(mut self, targeting: Targeting) -> Self {
        self.targeting = targeting;
        self
    }

    /// Retry policy handed to actions through the context.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the shared data.
    pub fn data(mut self, data: D) -> Self {
        self.data = data;
        self
    }

    /// Hook run once on the calling thread before any worker starts.
    pub fn setup<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn CommandTarget, &D) -> std::result::Result<(), Fault> + Send + Sync + 'static,
    {
        self.setup = Some(Box::new(hook));
        self
    }

    /// Hook run once after every worker has stopped, even if the run failed.
    pub fn teardown<F>(mut self, hook: F) -> Self
    where
        F: Fn(&dyn CommandTarget, &D) -> std::result::Result<(), Fault> + Send + Sync + 'static,
    {
        self.teardown = Some(Box::new(hook));
        self
    }

    /// Apply values from a settings file. Later builder calls override them.
    pub fn settings(mut self, settings: &WorkloadSettings) -> Self {
        self.thread_count = settings.thread_count;
        self.iterations = settings.iterations;
        if let Some(seed) = settings.seed {
            self.seed = Some(seed);
        }
        if let Some(targeting) = &settings.targeting {
            self.targeting = targeting.clone();
        }
        self.retry = settings.retry_config();
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if no state is registered, a state name
    /// is repeated, the start state is unknown, the worker or iteration count
    /// is zero, no transition policy was given, or the policy is malformed for
    /// any state reachable from the start state.
    pub fn build(self) -> Result<Workload<D>> {
        if self.states.is_empty() {
            return Err(Error::configuration("workload has no states"));
        }

        let mut seen = FxHashSet::default();
        for state in &self.states {
            if !seen.insert(state.name()) {
                return Err(Error::configuration(format!(
                    "state '{}' is registered more than once",
                    state.name()
                )));
            }
        }

        if self.thread_count == 0 {
            return Err(Error::configuration("thread_count must be positive"));
        }
        if self.iterations == 0 {
            return Err(Error::configuration("iterations must be positive"));
        }

        let names: Vec<String> = self.states.iter().map(|s| s.name().to_string()).collect();
        let start = match &self.start_state {
            Some(start) => names.iter().position(|n| n == start).ok_or_else(|| {
                Error::configuration(format!("start state '{start}' is not registered"))
            })?,
            None => 0,
        };

        let table = match &self.transitions {
            Some(TransitionPolicy::Explicit(transitions)) => {
                TransitionTable::compile(&names, start, transitions)?
            }
            Some(TransitionPolicy::Uniform) => {
                TransitionTable::compile(&names, start, &Transitions::uniform(&names))?
            }
            None => return Err(Error::configuration("workload has no transition policy")),
        };

        Ok(Workload {
            states: self.states,
            table,
            start,
            thread_count: self.thread_count,
            iterations: self.iterations,
            seed: self.seed,
            targeting: self.targeting,
            retry: self.retry,
            data: self.data,
            setup: self.setup,
            teardown: self.teardown,
        })
    }
}
