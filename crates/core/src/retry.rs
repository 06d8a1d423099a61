//! Bounded retry loops
//!
//! [`RetryTracker`] bounds a retry loop by attempt count and wall-clock
//! deadline. It does not know whether an attempt succeeded; the caller performs
//! one action per yielded entry and breaks out on success.
//!
//! ```ignore
//! for attempt in RetryTracker::new(3, Duration::from_secs(3)) {
//!     if try_command().is_ok() {
//!         break;
//!     }
//!     tracing::debug!(remaining = attempt.remaining_attempts, "retrying");
//! }
//! ```
//!
//! The timer starts when the tracker is created, not when iteration begins.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::outcome::Outcome;
use crate::reply::Acknowledged;

// ============================================================================
// Retry Configuration
// ============================================================================

/// Configuration for retrying commands against the system under test
///
/// # Example
/// ```ignore
/// let config = RetryConfig::new()
///     .with_max_attempts(5)
///     .with_timeout(Duration::from_secs(10));
/// let outcome = retry_until_ok(&config, |_| target.run_command("db", &cmd, None).into());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (0 = never attempt)
    pub max_attempts: u32,
    /// Deadline measured from the creation of the tracker
    pub timeout: Duration,
    /// Base delay between attempts (exponential backoff)
    pub base_delay: Duration,
    /// Maximum delay between attempts
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(30),
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Create a new RetryConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set maximum number of attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the overall deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set base delay for exponential backoff
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set maximum delay between attempts
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after the given (0-indexed) attempt failed
    pub fn delay_for(&self, attempt: u32) -> Duration {
        // Cap the shift to prevent overflow
        let shift = attempt.min(31);
        let delay = self.base_delay.saturating_mul(1u32 << shift);
        delay.min(self.max_delay)
    }
}

// ============================================================================
// Retry Tracker
// ============================================================================

/// One entry produced by a [`RetryTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAttempt {
    /// 0-indexed number of this attempt
    pub attempt: u32,
    /// Attempts left after this one
    pub remaining_attempts: u32,
    /// Time left before the deadline, as of this attempt
    pub remaining_time: Duration,
}

/// Bounds a retry loop by attempt count and deadline.
///
/// Iterating consumes the tracker, so a sequence cannot be restarted.
#[derive(Debug, Clone)]
pub struct RetryTracker {
    max_attempts: u32,
    timeout: Duration,
    start: Instant,
}

impl RetryTracker {
    /// Start a tracker now.
    pub fn new(max_attempts: u32, timeout: Duration) -> Self {
        Self {
            max_attempts,
            timeout,
            start: Instant::now(),
        }
    }

    /// Start a tracker bounded by a [`RetryConfig`].
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.timeout)
    }

    /// Maximum number of entries this tracker will ever produce
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Deadline measured from creation
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time since creation
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl IntoIterator for RetryTracker {
    type Item = RetryAttempt;
    type IntoIter = RetryIter;

    fn into_iter(self) -> RetryIter {
        RetryIter {
            tracker: self,
            next: 0,
            done: false,
        }
    }
}

/// Iterator over the entries of a [`RetryTracker`].
#[derive(Debug)]
pub struct RetryIter {
    tracker: RetryTracker,
    next: u32,
    done: bool,
}

impl Iterator for RetryIter {
    type Item = RetryAttempt;

    fn next(&mut self) -> Option<RetryAttempt> {
        if self.done || self.next >= self.tracker.max_attempts {
            self.done = true;
            return None;
        }

        let elapsed = self.tracker.elapsed();
        if elapsed > self.tracker.timeout {
            self.done = true;
            return None;
        }

        let attempt = self.next;
        self.next += 1;
        Some(RetryAttempt {
            attempt,
            remaining_attempts: self.tracker.max_attempts - attempt - 1,
            remaining_time: self.tracker.timeout - elapsed,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let left = self.tracker.max_attempts.saturating_sub(self.next) as usize;
        (0, Some(left))
    }
}

impl std::iter::FusedIterator for RetryIter {}

/// Call `op` once per tracker entry until it produces an acknowledged outcome.
///
/// Sleeps the configured backoff between failed attempts, never past the
/// deadline. Returns the last outcome, or `None` if the tracker yielded no
/// entries (zero attempts or an already-expired deadline).
pub fn retry_until_ok<T, E, F>(config: &RetryConfig, mut op: F) -> Option<Outcome<T, E>>
where
    T: Acknowledged,
    F: FnMut(&RetryAttempt) -> Outcome<T, E>,
{
    let mut last = None;

    for attempt in RetryTracker::from_config(config) {
        let outcome = op(&attempt);
        if outcome.is_ok() {
            return Some(outcome);
        }
        last = Some(outcome);

        if attempt.remaining_attempts == 0 {
            break;
        }
        let delay = config.delay_for(attempt.attempt).min(attempt.remaining_time);
        debug!(
            target: "fsmload::retry",
            attempt = attempt.attempt,
            remaining = attempt.remaining_attempts,
            delay_ms = delay.as_millis() as u64,
            "Attempt not acknowledged, retrying"
        );
        std::thread::sleep(delay);
    }

    last
}
