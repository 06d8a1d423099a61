//! Error types for fsmload
//!
//! Two kinds of failure flow through the system:
//!
//! - [`Fault`]: a failure raised by the system under test (or synthesised on
//!   its behalf). Faults carry an [`ErrorCode`] so workloads can declare which
//!   ones are tolerated under benign races.
//! - [`Error`]: failures of fsmload itself (bad configuration, a fatal fault
//!   surfacing from a run, I/O while reading settings).
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for fsmload operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error code reported by the system under test.
///
/// Codes are opaque to fsmload: workloads decide which codes they tolerate.
/// Negative codes are reserved for failures fsmload synthesises itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// An action panicked instead of returning.
    pub const ACTION_PANICKED: ErrorCode = ErrorCode(-1);
    /// A failed reply carried no usable code.
    pub const UNKNOWN: ErrorCode = ErrorCode(-2);

    /// Raw numeric value
    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        ErrorCode(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A failure raised by a command against the system under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{} ({code}): {message}", .code_name.as_deref().unwrap_or("Error"))]
pub struct Fault {
    /// Numeric code
    pub code: ErrorCode,
    /// Symbolic name of the code, when the server supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_name: Option<String>,
    /// Human-readable message
    pub message: String,
}

impl Fault {
    /// Create a fault with a code and message.
    pub fn new(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Fault {
            code: code.into(),
            code_name: None,
            message: message.into(),
        }
    }

    /// Attach the symbolic code name.
    pub fn with_code_name(mut self, name: impl Into<String>) -> Self {
        self.code_name = Some(name.into());
        self
    }

    /// Fault recorded when an action panics.
    pub fn panicked(message: impl Into<String>) -> Self {
        Fault::new(ErrorCode::ACTION_PANICKED, message).with_code_name("ActionPanicked")
    }

    /// True if this fault carries the given code.
    pub fn has_code(&self, code: impl Into<ErrorCode>) -> bool {
        self.code == code.into()
    }
}

/// Error types for fsmload
#[derive(Debug, Error)]
pub enum Error {
    /// The workload description is malformed. Detected before any worker starts.
    #[error("Configuration error: {reason}")]
    Configuration {
        /// What is wrong with the configuration
        reason: String,
    },

    /// A fault outside the tolerated set aborted a workload run.
    #[error("Fatal fault in {} (state {}): {fault}",
        .worker.map(|w| format!("worker {w}")).unwrap_or_else(|| "workload hook".to_string()),
        .state.as_deref().unwrap_or("-"))]
    Fatal {
        /// Worker that raised the fault (`None` for setup/teardown hooks)
        worker: Option<usize>,
        /// State whose action raised the fault
        state: Option<String>,
        /// The fault itself
        fault: Fault,
    },

    /// A settings file could not be parsed
    #[error("Failed to parse config file '{path}': {reason}")]
    ConfigParse {
        /// File that failed to parse
        path: String,
        /// Parser message
        reason: String,
    },

    /// I/O error (settings files, thread spawning)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Build a configuration error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Error::Configuration {
            reason: reason.into(),
        }
    }

    /// True for [`Error::Configuration`].
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    /// True for [`Error::Fatal`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal { .. })
    }

    /// The fault behind a fatal error, if any.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Error::Fatal { fault, .. } => Some(fault),
            _ => None,
        }
    }
}
