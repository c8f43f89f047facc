//! Strategies for re-running failed call attempts.
//!
//! A [`RetryStrategy`] owns the attempt loop of one call. It is handed an
//! attempt closure that runs the transport send wrapped in error
//! classification, so by the time an error reaches the strategy it is
//! already one of the crate's [`Error`](crate::Error) variants. The
//! strategy decides whether to invoke the closure again based only on
//! [`Error::is_transient`](crate::Error::is_transient), never by
//! inspecting transport payloads.
//!
//! Strategies never sleep. Pacing between attempts belongs to the caller
//! or the transport, not to the composition core.

use std::sync::Arc;

use crate::Result;

/// Drives the attempt loop of one call.
///
/// `R` is the raw outcome the transport produces per attempt. The strategy
/// re-invokes `attempt` at will; every invocation is a full fresh attempt
/// including request build and error classification.
pub trait RetryStrategy<R>: Send + Sync {
    /// Runs `attempt` until it succeeds, fails permanently, or the
    /// strategy gives up. The returned error is the last attempt's error,
    /// unchanged.
    fn retry(&self, attempt: &mut dyn FnMut() -> Result<R>) -> Result<R>;
}

impl<R, S> RetryStrategy<R> for Arc<S>
where
    S: RetryStrategy<R> + ?Sized,
{
    fn retry(&self, attempt: &mut dyn FnMut() -> Result<R>) -> Result<R> {
        (**self).retry(attempt)
    }
}

/// Runs the attempt exactly once and passes its outcome through.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl<R> RetryStrategy<R> for NoRetry {
    fn retry(&self, attempt: &mut dyn FnMut() -> Result<R>) -> Result<R> {
        attempt()
    }
}

/// Re-runs transient failures up to a fixed total attempt budget.
///
/// The budget counts attempts, not retries: a budget of 3 makes at most
/// three invocations. Non-transient errors end the loop immediately, and
/// the final attempt's error is returned as-is.
#[derive(Debug, Clone, Copy)]
pub struct LimitedRetry {
    attempts: u32,
}

impl LimitedRetry {
    /// Creates a strategy with the given total attempt budget. A budget
    /// of zero is treated as one: every call gets at least one attempt.
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }

    /// The total attempt budget.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for LimitedRetry {
    /// Three total attempts.
    fn default() -> Self {
        Self::new(3)
    }
}

impl<R> RetryStrategy<R> for LimitedRetry {
    fn retry(&self, attempt: &mut dyn FnMut() -> Result<R>) -> Result<R> {
        let mut remaining = self.attempts;
        loop {
            remaining -= 1;
            match attempt() {
                Ok(value) => return Ok(value),
                Err(err) if remaining > 0 && err.is_transient() => {
                    tracing::warn!(
                        remaining,
                        error = %err,
                        "transient failure, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}
