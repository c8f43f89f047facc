//! Deferred results and the adapter that lets synchronous strategies
//! drive them.
//!
//! A [`Deferred`] stands in for a result that is still being produced.
//! The holder decides when to block: [`Deferred::wait`] resolves it,
//! [`Deferred::wait_timeout`] bounds the wait, and dropping it without
//! waiting abandons the work without error.
//!
//! [`Async`] adapts an [`ErrorStrategy`] or [`RetryStrategy`] written for
//! plain raw outcomes so it operates on `Deferred` outcomes instead. The
//! adapter starts the underlying work immediately but applies the wrapped
//! strategy only when the caller waits, so a call composed through it
//! never blocks on the way out. The composition order of build, send,
//! classification, and retry is unchanged; only the blocking wait moves
//! to the caller.

use std::fmt;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::classify::ErrorStrategy;
use crate::retry::RetryStrategy;
use crate::spec::RequestSpec;
use crate::{Error, Result};

/// A result that resolves on demand.
///
/// Once a channel-backed deferred has resolved, the outcome is kept and
/// every later wait returns it again. A timed-out wait does not settle
/// anything: the work is still pending and can be waited on again.
pub struct Deferred<T> {
    source: Source<T>,
}

enum Source<T> {
    /// Outcome will arrive from a background task.
    Pending(mpsc::Receiver<Result<T>>),
    /// Outcome already known.
    Settled(Result<T>),
    /// Outcome produced by running wrapped strategies over an inner
    /// deferred. Re-run on every wait; the inner deferred caches, the
    /// strategies do not.
    Chained(Box<dyn FnMut(Option<Duration>) -> Result<T> + Send>),
}

/// The producing half of [`Deferred::channel`].
pub struct Resolver<T> {
    tx: mpsc::Sender<Result<T>>,
}

impl<T> Resolver<T> {
    /// Delivers the outcome. If the deferred was dropped the outcome is
    /// discarded.
    pub fn resolve(self, outcome: Result<T>) {
        let _ = self.tx.send(outcome);
    }
}

impl<T> Deferred<T> {
    /// Creates a pending deferred and the handle that completes it.
    ///
    /// Dropping the [`Resolver`] without resolving makes every wait
    /// return [`Error::Disconnected`].
    pub fn channel() -> (Resolver<T>, Deferred<T>) {
        let (tx, rx) = mpsc::channel();
        (
            Resolver { tx },
            Deferred {
                source: Source::Pending(rx),
            },
        )
    }

    /// A deferred that is already resolved.
    pub fn settled(outcome: Result<T>) -> Self {
        Deferred {
            source: Source::Settled(outcome),
        }
    }

    /// A deferred computed by `run` on every wait. `run` receives the
    /// caller's timeout and is expected to pass it down to whatever it
    /// waits on.
    pub fn from_fn(run: impl FnMut(Option<Duration>) -> Result<T> + Send + 'static) -> Self {
        Deferred {
            source: Source::Chained(Box::new(run)),
        }
    }
}

impl<T: Clone> Deferred<T> {
    /// Blocks until the outcome is available and returns it.
    pub fn wait(&mut self) -> Result<T> {
        self.resolve(None)
    }

    /// Blocks for at most `timeout`. Returns [`Error::Timeout`] if the
    /// outcome did not arrive in time; the deferred stays pending.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<T> {
        self.resolve(Some(timeout))
    }

    fn resolve(&mut self, timeout: Option<Duration>) -> Result<T> {
        match &mut self.source {
            Source::Settled(outcome) => outcome.clone(),
            Source::Pending(rx) => {
                let outcome = match timeout {
                    None => match rx.recv() {
                        Ok(outcome) => outcome,
                        Err(_) => Err(Error::Disconnected),
                    },
                    Some(limit) => match rx.recv_timeout(limit) {
                        Ok(outcome) => outcome,
                        Err(mpsc::RecvTimeoutError::Timeout) => return Err(Error::Timeout),
                        Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::Disconnected),
                    },
                };
                self.source = Source::Settled(outcome.clone());
                outcome
            }
            Source::Chained(run) => run(timeout),
        }
    }
}

impl<T: Clone + Send + 'static> Deferred<T> {
    /// Derives a deferred whose outcome is `f` applied to this one's.
    ///
    /// `f` runs at wait time, once per wait, with this deferred's cached
    /// outcome after it first resolves.
    pub fn map<U>(mut self, mut f: impl FnMut(T) -> Result<U> + Send + 'static) -> Deferred<U> {
        Deferred::from_fn(move |timeout| f(self.resolve(timeout)?))
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.source {
            Source::Pending(_) => "pending",
            Source::Settled(_) => "settled",
            Source::Chained(_) => "chained",
        };
        f.debug_tuple("Deferred").field(&state).finish()
    }
}

/// Adapts a strategy over raw outcomes into one over deferred outcomes.
///
/// Invoking the adapted capability runs the given callable immediately,
/// expecting a [`Deferred`] back, and returns a new deferred that applies
/// the wrapped strategy when waited on. The wrapped strategy sees an
/// attempt callable that resolves the inner deferred with the caller's
/// timeout, so it runs the exact same logic it would have run
/// synchronously.
///
/// The adapter covers exactly the two strategy capabilities. A strategy
/// lacking one of them simply does not produce the corresponding adapted
/// implementation.
#[derive(Debug, Clone)]
pub struct Async<S> {
    wrapped: S,
}

impl<S> Async<S> {
    pub fn new(wrapped: S) -> Self {
        Self { wrapped }
    }
}

impl<S, R> ErrorStrategy<Deferred<R>> for Async<S>
where
    S: ErrorStrategy<R> + Clone + 'static,
    R: Clone + Send + 'static,
{
    fn handle(&self, send: &mut dyn FnMut() -> Result<Deferred<R>>) -> Result<Deferred<R>> {
        let mut pending = send()?;
        let strategy = self.wrapped.clone();
        Ok(Deferred::from_fn(move |timeout| {
            strategy.handle(&mut || pending.resolve(timeout))
        }))
    }
}

impl<S, R> RetryStrategy<Deferred<R>> for Async<S>
where
    S: RetryStrategy<R> + Clone + 'static,
    R: Clone + Send + 'static,
{
    fn retry(&self, attempt: &mut dyn FnMut() -> Result<Deferred<R>>) -> Result<Deferred<R>> {
        let mut pending = attempt()?;
        let strategy = self.wrapped.clone();
        Ok(Deferred::from_fn(move |timeout| {
            strategy.retry(&mut || pending.resolve(timeout))
        }))
    }
}

/// Converts a [`RequestSpec`] written for raw outcomes into one for
/// deferred outcomes by wrapping both strategies in [`Async`].
pub fn make_async<R>(request_spec: &RequestSpec<R>) -> RequestSpec<Deferred<R>>
where
    R: Clone + Send + 'static,
{
    RequestSpec::from_shared(
        Arc::new(Async::new(request_spec.retry_strategy())),
        Arc::new(Async::new(request_spec.error_strategy())),
    )
}
