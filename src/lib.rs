//! # Apiweave - declarative API clients and service views
//!
//! Apiweave assembles API clients out of four small, swappable parts:
//! schemas that shape payloads, a transport that moves them, an error
//! strategy that classifies outcomes, and a retry strategy that decides
//! whether to try again. Operations are declared as data and composed at
//! construction time; the same declarations drive a client on one side of
//! the wire and a service view on the other.
//!
//! ## Quick Start
//!
//! ```no_run
//! use apiweave::{
//!     to_fields, ApiSpec, Client, ClientSpec, HttpTransport, MetaSchema, ObjectSchema,
//!     RequestSpec, BODY_SEGMENT, PATH_SEGMENT, QUERY_SEGMENT,
//! };
//! use serde_json::json;
//!
//! fn main() -> Result<(), apiweave::Error> {
//!     // Declare how the operation's payloads are shaped.
//!     let input = MetaSchema::builder()
//!         .segment(PATH_SEGMENT, ObjectSchema::new().required("id"))
//!         .segment(QUERY_SEGMENT, ObjectSchema::new().optional("verbose"))
//!         .build()?;
//!     let output = MetaSchema::builder()
//!         .segment(BODY_SEGMENT, ObjectSchema::new().required("id").optional("title"))
//!         .build()?;
//!
//!     // Compose the client: one transport, named operations.
//!     let client = Client::builder(HttpTransport::new("http://localhost:8080")?)
//!         .operation(
//!             "get_volume",
//!             ClientSpec::new(
//!                 ApiSpec::get("volumes/{id}", input, output),
//!                 RequestSpec::http_default(),
//!             ),
//!         )
//!         .build()?;
//!
//!     // Calls are plain field maps in, plain field maps out.
//!     let volume = client.call("get_volume", to_fields(json!({ "id": "v-1" }))?)?;
//!     println!("title: {:?}", volume.get("title"));
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Declarative operations** - An [`ApiSpec`] names a path template, a
//!   method, and a schema pair; clients and servlets are assembled from
//!   specs, not subclassed
//! - **Segmented schemas** - A [`MetaSchema`] routes fields to path,
//!   query, body, and header segments and rejects ambiguous compositions
//!   at build time
//! - **Pluggable strategies** - Retry and error classification are
//!   independent traits, paired per operation through a [`RequestSpec`]
//! - **Deferred calls** - The [`Async`] adapter runs unchanged strategy
//!   logic over [`Deferred`] results; nothing blocks until the caller
//!   waits
//! - **Service views** - The same specs dispatch incoming requests to
//!   handler functions through a [`Service`]
//! - **Typed layer** - [`Client::call_as`] serializes arguments and
//!   deserializes responses through `serde`
//! - **Structured logging** - Dispatch, response, and retry events via
//!   `tracing`
//!
//! ## Error Handling
//!
//! Failures classify into permanent and transient kinds; only transient
//! ones are retried, and after the budget is spent the last transient
//! error comes back unchanged:
//!
//! ```no_run
//! # use apiweave::{
//! #     to_fields, ApiSpec, Client, ClientSpec, Error, HttpTransport, MetaSchema, RequestSpec,
//! # };
//! # fn example() -> Result<(), Error> {
//! # let schema = || MetaSchema::builder().build();
//! # let client = Client::builder(HttpTransport::new("http://localhost:8080")?)
//! #     .operation(
//! #         "get_volume",
//! #         ClientSpec::new(
//! #             ApiSpec::get("volumes", schema()?, schema()?),
//! #             RequestSpec::http_default(),
//! #         ),
//! #     )
//! #     .build()?;
//! # let fields = to_fields(serde_json::json!({}))?;
//! match client.call("get_volume", fields) {
//!     Ok(volume) => println!("{volume:?}"),
//!     Err(Error::NotFound { detail }) => eprintln!("no such volume: {detail}"),
//!     Err(error) if error.is_transient() => eprintln!("still unavailable: {error}"),
//!     Err(error) => eprintln!("call failed: {error}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Deferred Calls
//!
//! Swap the transport for [`DeferredHttpTransport`] and wrap the request
//! spec with [`make_async`]; the call returns a [`Deferred`] immediately
//! and the caller picks when, and how long, to wait:
//!
//! ```no_run
//! use apiweave::{
//!     make_async, to_fields, ApiSpec, Client, ClientSpec, DeferredHttpTransport, MetaSchema,
//!     ObjectSchema, RequestSpec, BODY_SEGMENT, PATH_SEGMENT,
//! };
//! use serde_json::json;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = tokio::runtime::Runtime::new()?;
//!
//!     let input = MetaSchema::builder()
//!         .segment(PATH_SEGMENT, ObjectSchema::new().required("id"))
//!         .build()?;
//!     let output = MetaSchema::builder()
//!         .segment(BODY_SEGMENT, ObjectSchema::new().required("id"))
//!         .build()?;
//!
//!     let transport =
//!         DeferredHttpTransport::with_handle("http://localhost:8080", runtime.handle().clone())?;
//!     let client = Client::builder(transport)
//!         .operation(
//!             "get_volume",
//!             ClientSpec::new(
//!                 ApiSpec::get("volumes/{id}", input, output),
//!                 make_async(&RequestSpec::http_default()),
//!             ),
//!         )
//!         .build()?;
//!
//!     let mut pending = client.call("get_volume", to_fields(json!({ "id": "v-1" }))?)?;
//!     // The request is in flight; wait when ready.
//!     let volume = pending.wait_timeout(Duration::from_secs(5))?;
//!     println!("id: {:?}", volume.get("id"));
//!     Ok(())
//! }
//! ```

pub mod classify;
mod client;
mod deferred;
mod error;
mod http;
mod meta;
pub mod retry;
pub mod schema;
mod service;
mod spec;
pub mod transport;

pub use classify::{ErrorStrategy, HttpErrorStrategy, NoErrorStrategy, StatusSource};
pub use client::{Client, ClientBuilder};
pub use deferred::{make_async, Async, Deferred, Resolver};
pub use error::{Error, Result};
pub use http::{DeferredHttpTransport, HttpTransport, JsonResponse};
pub use meta::{MetaSchema, MetaSchemaBuilder, SegmentMap};
pub use retry::{LimitedRetry, NoRetry, RetryStrategy};
pub use schema::{
    to_fields, EmptySchema, FieldMap, ObjectSchema, Schema, SegmentFields, ValueSchema,
};
pub use service::{SegmentSource, Service, ServiceBuilder, Servlet};
pub use spec::{ApiSpec, ClientSpec, RequestSpec};
pub use transport::{
    build_wire_request, Transport, WireRequest, BODY_SEGMENT, HEADERS_SEGMENT, PATH_SEGMENT,
    QUERY_SEGMENT,
};
