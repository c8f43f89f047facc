//! Declarative call specifications.
//!
//! A client is assembled from data, not subclasses: an [`ApiSpec`] names
//! one remote operation (path template, method, schema pair), a
//! [`RequestSpec`] bundles the strategies that wrap its attempts, and a
//! [`ClientSpec`] ties the two together under a call name. The same
//! [`ApiSpec`] drives a client on one side of the wire and a
//! [`Servlet`](crate::Servlet) on the other.

use std::sync::Arc;

use http::Method;

use crate::classify::{ErrorStrategy, HttpErrorStrategy, StatusSource};
use crate::meta::MetaSchema;
use crate::retry::{LimitedRetry, RetryStrategy};

/// One remote operation: where it lives and how its payloads look.
///
/// `name` is the request path relative to the transport's base URL. It
/// may contain `{field}` placeholders filled from the serialized `path`
/// segment at build time, so `"volumes/{id}"` plus a path schema
/// declaring `id` addresses one volume per call.
#[derive(Debug, Clone)]
pub struct ApiSpec {
    name: String,
    method: Method,
    input_schema: MetaSchema,
    output_schema: MetaSchema,
}

impl ApiSpec {
    /// Creates a spec with an explicit method.
    pub fn new(
        name: impl Into<String>,
        method: Method,
        input_schema: MetaSchema,
        output_schema: MetaSchema,
    ) -> Self {
        Self {
            name: name.into(),
            method,
            input_schema,
            output_schema,
        }
    }

    /// A GET operation.
    pub fn get(
        name: impl Into<String>,
        input_schema: MetaSchema,
        output_schema: MetaSchema,
    ) -> Self {
        Self::new(name, Method::GET, input_schema, output_schema)
    }

    /// A POST operation.
    pub fn post(
        name: impl Into<String>,
        input_schema: MetaSchema,
        output_schema: MetaSchema,
    ) -> Self {
        Self::new(name, Method::POST, input_schema, output_schema)
    }

    /// The path template this operation is served under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Schema composing the request's segments.
    pub fn input_schema(&self) -> &MetaSchema {
        &self.input_schema
    }

    /// Schema composing the response's segments.
    pub fn output_schema(&self) -> &MetaSchema {
        &self.output_schema
    }
}

/// The strategy pair wrapped around every attempt of one call.
///
/// `R` is the transport's raw per-attempt outcome; a spec written for a
/// blocking transport is converted for a deferred one with
/// [`make_async`](crate::make_async) rather than rewritten.
pub struct RequestSpec<R> {
    retry_strategy: Arc<dyn RetryStrategy<R>>,
    error_strategy: Arc<dyn ErrorStrategy<R>>,
}

impl<R> RequestSpec<R> {
    /// Bundles a retry and an error strategy.
    pub fn new(
        retry_strategy: impl RetryStrategy<R> + 'static,
        error_strategy: impl ErrorStrategy<R> + 'static,
    ) -> Self {
        Self {
            retry_strategy: Arc::new(retry_strategy),
            error_strategy: Arc::new(error_strategy),
        }
    }

    /// Bundles strategies that are already shared.
    pub fn from_shared(
        retry_strategy: Arc<dyn RetryStrategy<R>>,
        error_strategy: Arc<dyn ErrorStrategy<R>>,
    ) -> Self {
        Self {
            retry_strategy,
            error_strategy,
        }
    }

    /// The retry strategy, shared.
    pub fn retry_strategy(&self) -> Arc<dyn RetryStrategy<R>> {
        Arc::clone(&self.retry_strategy)
    }

    /// The error strategy, shared.
    pub fn error_strategy(&self) -> Arc<dyn ErrorStrategy<R>> {
        Arc::clone(&self.error_strategy)
    }
}

impl<R> RequestSpec<R>
where
    R: StatusSource,
{
    /// The stock HTTP pairing: status-code classification with three
    /// total attempts.
    pub fn http_default() -> Self {
        Self::new(LimitedRetry::default(), HttpErrorStrategy)
    }
}

impl<R> Clone for RequestSpec<R> {
    fn clone(&self) -> Self {
        Self {
            retry_strategy: Arc::clone(&self.retry_strategy),
            error_strategy: Arc::clone(&self.error_strategy),
        }
    }
}

impl<R> std::fmt::Debug for RequestSpec<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSpec").finish_non_exhaustive()
    }
}

/// One callable operation: an [`ApiSpec`] plus its [`RequestSpec`].
#[derive(Debug, Clone)]
pub struct ClientSpec<R> {
    api_spec: ApiSpec,
    request_spec: RequestSpec<R>,
}

impl<R> ClientSpec<R> {
    pub fn new(api_spec: ApiSpec, request_spec: RequestSpec<R>) -> Self {
        Self {
            api_spec,
            request_spec,
        }
    }

    pub fn api_spec(&self) -> &ApiSpec {
        &self.api_spec
    }

    pub fn request_spec(&self) -> &RequestSpec<R> {
        &self.request_spec
    }
}
