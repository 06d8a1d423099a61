//! The command seam to the system under test
//!
//! Everything fsmload does against a server goes through [`CommandTarget`]. The
//! trait says nothing about wire protocols, so a real driver, a proxy that
//! injects faults, or the in-memory [`MemoryTarget`] can all sit behind it.
//!
//! [`MemoryTarget`]: crate::testing::MemoryTarget

use std::sync::Arc;

use crate::error::Fault;
use crate::reply::{Document, Reply};
use crate::types::Concern;

/// Synchronous request/response command execution against the system under test.
///
/// Thread safety: workers share one target, so all methods must be safe to
/// call concurrently (requires Send + Sync). Implementations must not rely on
/// callers for serialization; conflicting commands are the server's problem.
pub trait CommandTarget: Send + Sync {
    /// Run `command` against database `db`.
    ///
    /// Returns the reply when the call completed, even if the reply itself
    /// reports a failure (see [`Reply::is_success`]).
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the call raised: network errors, server
    /// exceptions, or anything else that produced no reply.
    fn run_command(
        &self,
        db: &str,
        command: &Document,
        concern: Option<&Concern>,
    ) -> Result<Reply, Fault>;
}

impl<T: CommandTarget + ?Sized> CommandTarget for &T {
    fn run_command(
        &self,
        db: &str,
        command: &Document,
        concern: Option<&Concern>,
    ) -> Result<Reply, Fault> {
        (**self).run_command(db, command, concern)
    }
}

impl<T: CommandTarget + ?Sized> CommandTarget for Arc<T> {
    fn run_command(
        &self,
        db: &str,
        command: &Document,
        concern: Option<&Concern>,
    ) -> Result<Reply, Fault> {
        (**self).run_command(db, command, concern)
    }
}

impl<T: CommandTarget + ?Sized> CommandTarget for Box<T> {
    fn run_command(
        &self,
        db: &str,
        command: &Document,
        concern: Option<&Concern>,
    ) -> Result<Reply, Fault> {
        (**self).run_command(db, command, concern)
    }
}

/// Name of a command document: its first key.
pub fn command_name(command: &Document) -> Option<&str> {
    command.keys().next().map(String::as_str)
}
