//! States and their tolerated-fault allow-lists
//!
//! A [`State`] is a named action plus the set of error codes the action is
//! allowed to raise under benign concurrent interleavings. States are
//! immutable once registered with a builder.

use rustc_hash::FxHashSet;
use std::fmt;

use fsmload_core::{ErrorCode, Fault};

use crate::context::ActionContext;

/// Action bound to a state.
///
/// Returning `Err` raises a fault; whether it is fatal depends on the state's
/// [`ToleratedFaults`].
pub type Action<D> = Box<dyn Fn(&mut ActionContext<'_, D>) -> Result<(), Fault> + Send + Sync>;

/// Set of error codes a state's action may raise without failing the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToleratedFaults {
    codes: FxHashSet<ErrorCode>,
}

impl ToleratedFaults {
    /// Tolerate nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Tolerate exactly these codes.
    pub fn of<I, C>(codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ErrorCode>,
    {
        ToleratedFaults {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a code.
    pub fn insert(&mut self, code: impl Into<ErrorCode>) {
        self.codes.insert(code.into());
    }

    /// True if the fault's code is on the list.
    pub fn tolerates(&self, fault: &Fault) -> bool {
        self.codes.contains(&fault.code)
    }

    /// True if `code` is on the list.
    pub fn contains(&self, code: impl Into<ErrorCode>) -> bool {
        self.codes.contains(&code.into())
    }

    /// Number of tolerated codes
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// True if nothing is tolerated
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// A named unit of work.
pub struct State<D> {
    name: String,
    action: Action<D>,
    tolerated: ToleratedFaults,
}

impl<D> State<D> {
    /// Create a state that tolerates no faults.
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut ActionContext<'_, D>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        State {
            name: name.into(),
            action: Box::new(action),
            tolerated: ToleratedFaults::none(),
        }
    }

    /// Replace the tolerated-fault allow-list.
    pub fn tolerating(mut self, tolerated: ToleratedFaults) -> Self {
        self.tolerated = tolerated;
        self
    }

    /// State name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tolerated-fault allow-list
    pub fn tolerated(&self) -> &ToleratedFaults {
        &self.tolerated
    }

    pub(crate) fn invoke(&self, ctx: &mut ActionContext<'_, D>) -> Result<(), Fault> {
        (self.action)(ctx)
    }
}

impl<D> fmt::Debug for State<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("tolerated", &self.tolerated)
            .finish_non_exhaustive()
    }
}
