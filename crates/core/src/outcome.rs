//! Uniform wrapper around a fallible call's outcome
//!
//! An [`Outcome`] holds either the value a call returned or the fault it
//! raised, never both and never neither. It lets retry loops and workload
//! actions branch on the result without immediately propagating the fault.
//!
//! ```ignore
//! let res = Outcome::evaluate(|| target.run_command("admin", &ping, None));
//! if res.is_ok() {
//!     // ...
//! }
//! let reply = res.into_result()?; // returns the value or propagates the fault
//! ```

use crate::error::Fault;
use crate::reply::Acknowledged;

/// The value a call returned, or the fault it raised.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T, E = Fault> {
    /// The call returned normally
    Value(T),
    /// The call raised
    Fault(E),
}

impl<T, E> Outcome<T, E> {
    /// Wrap a returned value.
    pub fn from_value(value: T) -> Self {
        Outcome::Value(value)
    }

    /// Wrap a raised fault.
    pub fn from_fault(fault: E) -> Self {
        Outcome::Fault(fault)
    }

    /// Invoke `operation` and capture whatever it produces. Never fails itself.
    pub fn evaluate<F>(operation: F) -> Self
    where
        F: FnOnce() -> Result<T, E>,
    {
        operation().into()
    }

    /// True if a fault was captured.
    pub fn is_fault(&self) -> bool {
        matches!(self, Outcome::Fault(_))
    }

    /// The returned value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Value(v) => Some(v),
            Outcome::Fault(_) => None,
        }
    }

    /// The captured fault, if any.
    pub fn fault(&self) -> Option<&E> {
        match self {
            Outcome::Value(_) => None,
            Outcome::Fault(e) => Some(e),
        }
    }

    /// Return the value, or hand the captured fault back as `Err` for `?`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Value(v) => Ok(v),
            Outcome::Fault(e) => Err(e),
        }
    }

    /// Borrowing view as a standard `Result`.
    pub fn as_result(&self) -> Result<&T, &E> {
        match self {
            Outcome::Value(v) => Ok(v),
            Outcome::Fault(e) => Err(e),
        }
    }

    /// Pass whichever side is present to a single callback.
    pub fn apply<R, F>(&self, callback: F) -> R
    where
        F: FnOnce(Result<&T, &E>) -> R,
    {
        callback(self.as_result())
    }

    /// Pass the value to `on_value` or the fault to `on_fault`.
    pub fn dispatch<R, V, X>(&self, on_value: V, on_fault: X) -> R
    where
        V: FnOnce(&T) -> R,
        X: FnOnce(&E) -> R,
    {
        match self {
            Outcome::Value(v) => on_value(v),
            Outcome::Fault(e) => on_fault(e),
        }
    }

    /// Transform the value, keeping a fault untouched.
    pub fn map<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Value(v) => Outcome::Value(f(v)),
            Outcome::Fault(e) => Outcome::Fault(e),
        }
    }
}

impl<T: Acknowledged, E> Outcome<T, E> {
    /// True iff no fault was captured and the value passes the success predicate.
    pub fn is_ok(&self) -> bool {
        match self {
            Outcome::Value(v) => v.is_acknowledged(),
            Outcome::Fault(_) => false,
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Outcome::Value(v),
            Err(e) => Outcome::Fault(e),
        }
    }
}

impl<T, E> From<Outcome<T, E>> for Result<T, E> {
    fn from(outcome: Outcome<T, E>) -> Self {
        outcome.into_result()
    }
}
