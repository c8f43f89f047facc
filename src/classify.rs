//! Error strategies: classify raw transport outcomes into [`Error`]s.
//!
//! An [`ErrorStrategy`] wraps a single send attempt. It runs the send,
//! inspects the raw outcome, and either passes it along or converts it
//! into the matching [`Error`] variant. Classification is the only place
//! protocol status codes are interpreted; everything downstream (the
//! retry loop in particular) reasons about [`Error`] variants alone.
//!
//! Errors the send itself produced, such as [`Error::Network`] or
//! [`Error::Timeout`], pass through unchanged. The strategy classifies
//! responses, not transport failures.

use std::sync::Arc;

use crate::{Error, Result};

/// Wraps one send attempt and classifies its raw outcome.
pub trait ErrorStrategy<R>: Send + Sync {
    /// Runs `send` once and maps the raw outcome to `Ok` or a classified
    /// [`Error`]. Must not invoke `send` more than once per call.
    fn handle(&self, send: &mut dyn FnMut() -> Result<R>) -> Result<R>;
}

impl<R, S> ErrorStrategy<R> for Arc<S>
where
    S: ErrorStrategy<R> + ?Sized,
{
    fn handle(&self, send: &mut dyn FnMut() -> Result<R>) -> Result<R> {
        (**self).handle(send)
    }
}

/// Passes every raw outcome through without classification.
///
/// With this strategy nothing is ever marked transient, so paired with
/// any retry strategy the call degenerates to a single attempt unless the
/// transport itself produced an [`Error::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoErrorStrategy;

impl<R> ErrorStrategy<R> for NoErrorStrategy {
    fn handle(&self, send: &mut dyn FnMut() -> Result<R>) -> Result<R> {
        send()
    }
}

/// A raw outcome that carries an HTTP-style status code.
///
/// Implemented by transport response types so [`HttpErrorStrategy`] can
/// classify them without knowing the concrete transport.
pub trait StatusSource {
    /// The status code of this outcome.
    fn status(&self) -> u16;

    /// A short human-readable description used in error details.
    fn detail(&self) -> String {
        format!("status {}", self.status())
    }
}

/// Classifies raw outcomes by HTTP status code.
///
/// Any 2xx status is success. 404 becomes [`Error::NotFound`] and 400
/// becomes [`Error::BadRequest`], both permanent. Every other status,
/// 5xx and the rest alike, becomes [`Error::Unavailable`], the one
/// transient variant: when in doubt the server is treated as temporarily
/// unhealthy rather than the caller as wrong.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpErrorStrategy;

impl<R> ErrorStrategy<R> for HttpErrorStrategy
where
    R: StatusSource,
{
    fn handle(&self, send: &mut dyn FnMut() -> Result<R>) -> Result<R> {
        let raw = send()?;
        match raw.status() {
            200..=299 => Ok(raw),
            404 => Err(Error::NotFound {
                detail: raw.detail(),
            }),
            400 => Err(Error::BadRequest {
                detail: raw.detail(),
            }),
            _ => Err(Error::Unavailable {
                detail: raw.detail(),
            }),
        }
    }
}
