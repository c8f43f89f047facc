//! Error types for client composition and execution.
//!
//! One error enum covers the whole pipeline: method resolution, schema
//! construction and (de)serialization, transport execution, response
//! classification, and deferred resolution. Strategies communicate through
//! this type. Error strategies produce classified variants, and retry
//! strategies consult [`Error::is_transient`] and nothing else.

use std::sync::Arc;

/// The error type for API client and service-view operations.
///
/// Classified client errors ([`Error::NotFound`], [`Error::BadRequest`])
/// and the transient [`Error::Unavailable`] are produced by error
/// strategies from raw transport results. Everything else is raised
/// directly by the component that detected the problem.
///
/// The type is `Clone` so a resolved deferred result can be handed out
/// more than once; the wrapped `reqwest` error sits behind an [`Arc`] for
/// that reason.
///
/// # Examples
///
/// ```
/// use apiweave::Error;
///
/// let err = Error::Unavailable {
///     detail: "status 503".to_string(),
/// };
/// assert!(err.is_transient());
///
/// let err = Error::BadRequest {
///     detail: "missing parameter".to_string(),
/// };
/// assert!(!err.is_transient());
/// ```
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// A method name was not registered with the client or service.
    ///
    /// Carries the looked-up name. Never retried.
    #[error("unknown api method: {name}")]
    MethodNotFound {
        /// The name that failed to resolve.
        name: String,
    },

    /// Two schema segments declared overlapping field keys.
    ///
    /// Raised while building a [`MetaSchema`](crate::MetaSchema), before
    /// any call is made. A composed schema that would merge ambiguously
    /// must not exist at all.
    #[error("schema segments {first:?} and {second:?} both declare {keys:?}")]
    SchemaCollision {
        /// First segment involved in the collision.
        first: String,
        /// Second segment involved in the collision.
        second: String,
        /// Every key declared by both segments.
        keys: Vec<String>,
    },

    /// A field declared as required was absent from the input.
    #[error("missing required field {field:?}")]
    MissingField {
        /// The declared field name.
        field: String,
    },

    /// Call arguments could not be turned into a wire payload.
    #[error("failed to serialize request: {detail}")]
    Serialize {
        /// What went wrong, including the offending value where useful.
        detail: String,
    },

    /// A wire response could not be turned back into a value.
    #[error("failed to deserialize response: {detail}")]
    Deserialize {
        /// What went wrong, including a response excerpt where useful.
        detail: String,
    },

    /// The server reported that the addressed resource does not exist.
    ///
    /// Classified, non-transient; carries response detail.
    #[error("not found: {detail}")]
    NotFound {
        /// Response detail captured at classification time.
        detail: String,
    },

    /// The server rejected the request as malformed.
    ///
    /// Classified, non-transient; carries response detail.
    #[error("bad request: {detail}")]
    BadRequest {
        /// Response detail captured at classification time.
        detail: String,
    },

    /// The service could not complete the request right now.
    ///
    /// The only transient classification: retry strategies re-invoke on
    /// this kind and on nothing else. Unknown statuses end up here rather
    /// than passing as success.
    #[error("service unavailable: {detail}")]
    Unavailable {
        /// Status and response detail captured at classification time.
        detail: String,
    },

    /// A network-level transport failure (connect, DNS, TLS, read).
    ///
    /// Not transient: classification is status-driven, and a request that
    /// never produced a status is not retried on the caller's behalf.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// A deferred result was not resolved within the caller's timeout.
    ///
    /// The underlying work keeps running; waiting again is legal and may
    /// succeed.
    #[error("timed out waiting for deferred result")]
    Timeout,

    /// The producer of a deferred result went away before completing.
    #[error("deferred result disconnected before completion")]
    Disconnected,

    /// Invalid client, transport, or schema assembly.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` if this error is the transient kind.
    ///
    /// Retry strategies call this and only this to decide whether to
    /// re-invoke an attempt; classification itself happens earlier, in
    /// the error strategy.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Unavailable { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(Arc::new(err))
    }
}

/// A specialized `Result` type for API client and service-view operations.
pub type Result<T> = std::result::Result<T, Error>;
