//! HTTP transports: a blocking one and a deferred one.
//!
//! Both transports share the stock build step from
//! [`crate::transport::build_wire_request`] and the same receive step,
//! deserializing a [`JsonResponse`] through the operation's output
//! schema. They differ only in what [`send`](Transport::send) yields:
//! [`HttpTransport`] blocks and returns the response, while
//! [`DeferredHttpTransport`] dispatches the request onto a Tokio runtime
//! and returns a [`Deferred`] immediately.

use http::{HeaderMap, StatusCode};
use serde_json::Value;
use tokio::runtime::Handle;
use url::Url;

use crate::classify::StatusSource;
use crate::deferred::Deferred;
use crate::meta::SegmentMap;
use crate::schema::FieldMap;
use crate::service::SegmentSource;
use crate::spec::ApiSpec;
use crate::transport::{Transport, WireRequest, BODY_SEGMENT, HEADERS_SEGMENT};
use crate::{Error, Result};

const DETAIL_SNIPPET_CHARS: usize = 200;

/// A received HTTP response, held as text until a schema asks for it.
///
/// This is the raw per-attempt outcome of both HTTP transports: the
/// error strategy classifies it by status, and `receive` deserializes it
/// through the output schema. The body is only parsed as JSON when a
/// schema actually reads it, so error responses with non-JSON bodies
/// still classify cleanly.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl JsonResponse {
    /// Creates a response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub(crate) fn read(response: reqwest::blocking::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text()?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub(crate) async fn read_async(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// The response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw body text.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Splits the response into deserializable segments.
    ///
    /// A non-empty body must be valid JSON and lands in the `body`
    /// segment; readable headers land as strings in the `headers`
    /// segment. Either segment is omitted when empty.
    pub fn segments(&self) -> Result<SegmentMap> {
        let mut payloads = SegmentMap::new();

        if !self.body.trim().is_empty() {
            let value: Value = serde_json::from_str(&self.body).map_err(|e| Error::Deserialize {
                detail: format!("response body is not valid JSON: {e}"),
            })?;
            payloads.insert(BODY_SEGMENT.to_string(), value);
        }

        let mut headers = FieldMap::new();
        for (name, value) in &self.headers {
            if let Ok(text) = value.to_str() {
                headers.insert(name.as_str().to_string(), Value::String(text.to_string()));
            }
        }
        if !headers.is_empty() {
            payloads.insert(HEADERS_SEGMENT.to_string(), Value::Object(headers));
        }

        Ok(payloads)
    }
}

/// A received response decomposes like an incoming request, so hosts can
/// hand one straight to a servlet.
impl SegmentSource for JsonResponse {
    fn segments(&self) -> Result<SegmentMap> {
        JsonResponse::segments(self)
    }
}

impl StatusSource for JsonResponse {
    fn status(&self) -> u16 {
        self.status.as_u16()
    }

    fn detail(&self) -> String {
        let body = self.body.trim();
        if body.is_empty() {
            return format!("status {}", self.status);
        }
        let snippet: String = body.chars().take(DETAIL_SNIPPET_CHARS).collect();
        if snippet.len() < body.len() {
            format!("status {}: {snippet}...", self.status)
        } else {
            format!("status {}: {snippet}", self.status)
        }
    }
}

/// Blocking HTTP transport on top of `reqwest`.
///
/// One attempt is one round trip: connection failures surface as
/// [`Error::Network`] and every received response, whatever its status,
/// is handed to the error strategy untouched.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Creates a transport with a default client.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            client: reqwest::blocking::Client::new(),
            base_url: normalize_base(base_url.as_ref())?,
        })
    }

    /// Creates a transport around a preconfigured client, for timeouts,
    /// proxies, or TLS settings beyond the defaults.
    pub fn with_client(
        base_url: impl AsRef<str>,
        client: reqwest::blocking::Client,
    ) -> Result<Self> {
        Ok(Self {
            client,
            base_url: normalize_base(base_url.as_ref())?,
        })
    }
}

impl Transport for HttpTransport {
    type Raw = JsonResponse;
    type Output = FieldMap;

    fn send(&self, request: WireRequest) -> Result<JsonResponse> {
        let url = absolute_url(&self.base_url, &request)?;
        tracing::debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = JsonResponse::read(builder.send()?)?;
        tracing::info!(status = response.status().as_u16(), "response received");
        Ok(response)
    }

    fn receive(&self, spec: &ApiSpec, raw: JsonResponse) -> Result<FieldMap> {
        spec.output_schema().deserialize(&raw.segments()?)
    }
}

/// Non-blocking HTTP transport: requests run on a Tokio runtime, results
/// come back as [`Deferred`]s.
///
/// `send` dispatches the request and returns immediately. Combined with
/// strategies wrapped by [`Async`](crate::Async), a whole call composes
/// without blocking; the response is only waited for when the caller
/// resolves the returned deferred.
#[derive(Debug, Clone)]
pub struct DeferredHttpTransport {
    client: reqwest::Client,
    base_url: Url,
    handle: Handle,
}

impl DeferredHttpTransport {
    /// Creates a transport on the current Tokio runtime.
    ///
    /// Fails with [`Error::Config`] when called outside one; use
    /// [`with_handle`](Self::with_handle) from non-runtime threads.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| {
            Error::Config("no tokio runtime in scope; pass one with with_handle".to_string())
        })?;
        Self::with_handle(base_url, handle)
    }

    /// Creates a transport dispatching onto the given runtime handle.
    pub fn with_handle(base_url: impl AsRef<str>, handle: Handle) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: normalize_base(base_url.as_ref())?,
            handle,
        })
    }

    /// Replaces the default client with a preconfigured one.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn perform(
        client: reqwest::Client,
        request: WireRequest,
        url: Url,
    ) -> Result<JsonResponse> {
        let mut builder = client.request(request.method, url).headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.json(&body);
        }
        let response = JsonResponse::read_async(builder.send().await?).await?;
        tracing::info!(status = response.status().as_u16(), "response received");
        Ok(response)
    }
}

impl Transport for DeferredHttpTransport {
    type Raw = Deferred<JsonResponse>;
    type Output = Deferred<FieldMap>;

    fn send(&self, request: WireRequest) -> Result<Deferred<JsonResponse>> {
        let url = absolute_url(&self.base_url, &request)?;
        tracing::debug!(method = %request.method, url = %url, "dispatching request");

        let client = self.client.clone();
        let (resolver, deferred) = Deferred::channel();
        self.handle.spawn(async move {
            resolver.resolve(Self::perform(client, request, url).await);
        });
        Ok(deferred)
    }

    fn receive(&self, spec: &ApiSpec, raw: Deferred<JsonResponse>) -> Result<Deferred<FieldMap>> {
        let schema = spec.output_schema().clone();
        Ok(raw.map(move |response| schema.deserialize(&response.segments()?)))
    }
}

/// Parses and normalizes a base URL so request paths join underneath it
/// instead of replacing its last segment.
fn normalize_base(raw: &str) -> Result<Url> {
    let mut base = Url::parse(raw)
        .map_err(|e| Error::Config(format!("invalid base URL {raw:?}: {e}")))?;
    if base.cannot_be_a_base() {
        return Err(Error::Config(format!("base URL {raw:?} cannot be a base")));
    }
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn absolute_url(base: &Url, request: &WireRequest) -> Result<Url> {
    let mut url = base
        .join(request.path.trim_start_matches('/'))
        .map_err(|e| Error::Config(format!("invalid request path {:?}: {e}", request.path)))?;
    if !request.query.is_empty() {
        url.query_pairs_mut().extend_pairs(&request.query);
    }
    Ok(url)
}
