//! The transport seam: building, sending, and receiving wire requests.
//!
//! A [`Transport`] owns the three wire-facing steps of a call. `build`
//! turns call fields into a [`WireRequest`] through the operation's input
//! schema, `send` performs one attempt, and `receive` turns the raw
//! outcome back into call fields through the output schema. Everything
//! between build and receive, classification and retries included, is
//! strategy territory and stays out of the transport.
//!
//! Serialized segments are tied to the wire by name: [`PATH_SEGMENT`]
//! fills the path template, [`QUERY_SEGMENT`] becomes query parameters,
//! [`BODY_SEGMENT`] the JSON body, and [`HEADERS_SEGMENT`] the headers.
//! Segments a schema never produces are simply left off the request.

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;

use crate::schema::FieldMap;
use crate::spec::ApiSpec;
use crate::{Error, Result};

/// Segment feeding the path template's `{field}` placeholders.
pub const PATH_SEGMENT: &str = "path";
/// Segment flattened into query parameters.
pub const QUERY_SEGMENT: &str = "query";
/// Segment sent as the JSON request body.
pub const BODY_SEGMENT: &str = "body";
/// Segment flattened into request headers.
pub const HEADERS_SEGMENT: &str = "headers";

/// One fully-assembled request, ready for a transport to send.
///
/// The path is already rendered: placeholders are filled and nothing in
/// here refers back to schemas or specs.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub method: Method,
    /// Path relative to the transport's base URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

/// Builds a [`WireRequest`] from an operation's input schema and fields.
///
/// This is the stock build step shared by the HTTP transports: serialize
/// through the input schema, then map the `path`, `query`, `body`, and
/// `headers` segments onto the wire.
pub fn build_wire_request(spec: &ApiSpec, fields: &FieldMap) -> Result<WireRequest> {
    let payloads = spec.input_schema().serialize(fields)?;
    Ok(WireRequest {
        method: spec.method().clone(),
        path: render_path(spec.name(), payloads.get(PATH_SEGMENT))?,
        query: query_pairs(payloads.get(QUERY_SEGMENT))?,
        body: payloads.get(BODY_SEGMENT).cloned(),
        headers: header_map(payloads.get(HEADERS_SEGMENT))?,
    })
}

/// Carries a call across the wire.
///
/// `Raw` is the outcome of one send attempt, the currency the error and
/// retry strategies wrap. `Output` is what a completed call hands back:
/// deserialized fields for a blocking transport, a deferred handle to
/// them for a non-blocking one.
pub trait Transport: Send + Sync {
    /// Outcome of one send attempt.
    type Raw;
    /// Outcome of a completed call.
    type Output;

    /// Builds the wire request for one attempt.
    fn build(&self, spec: &ApiSpec, fields: &FieldMap) -> Result<WireRequest> {
        build_wire_request(spec, fields)
    }

    /// Performs one attempt.
    fn send(&self, request: WireRequest) -> Result<Self::Raw>;

    /// Turns a raw outcome that survived classification and retries into
    /// the call's result.
    fn receive(&self, spec: &ApiSpec, raw: Self::Raw) -> Result<Self::Output>;
}

/// Fills `{field}` placeholders in a path template from the serialized
/// path segment.
///
/// Strict in both directions: a placeholder without a field and a field
/// without a placeholder are both errors, so a typo cannot silently
/// address the wrong resource.
fn render_path(template: &str, payload: Option<&Value>) -> Result<String> {
    let params = match payload {
        None => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            return Err(Error::Serialize {
                detail: format!("path segment must serialize to an object, got {other}"),
            })
        }
    };

    let mut rendered = String::with_capacity(template.len());
    let mut used: Vec<&str> = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        rendered.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            Error::Config(format!("unterminated placeholder in path template {template:?}"))
        })?;
        let field = &after[..end];
        let value = params.and_then(|map| map.get(field)).ok_or_else(|| {
            Error::MissingField {
                field: field.to_string(),
            }
        })?;
        let text = scalar_text(value).ok_or_else(|| Error::Serialize {
            detail: format!("path field {field:?} must be a scalar, got {value}"),
        })?;
        rendered.push_str(&text);
        used.push(field);
        rest = &after[end + 1..];
    }
    rendered.push_str(rest);

    if let Some(map) = params {
        for key in map.keys() {
            if !used.contains(&key.as_str()) {
                return Err(Error::Serialize {
                    detail: format!("path field {key:?} has no placeholder in {template:?}"),
                });
            }
        }
    }

    Ok(rendered)
}

fn query_pairs(payload: Option<&Value>) -> Result<Vec<(String, String)>> {
    let map = match payload {
        None => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(Error::Serialize {
                detail: format!("query segment must serialize to an object, got {other}"),
            })
        }
    };

    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            // A null parameter is one the caller chose not to send.
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    let text = scalar_text(item).ok_or_else(|| Error::Serialize {
                        detail: format!("query parameter {key:?} must hold scalars, got {item}"),
                    })?;
                    pairs.push((key.clone(), text));
                }
            }
            other => {
                let text = scalar_text(other).ok_or_else(|| Error::Serialize {
                    detail: format!("query parameter {key:?} must be a scalar, got {other}"),
                })?;
                pairs.push((key.clone(), text));
            }
        }
    }
    Ok(pairs)
}

fn header_map(payload: Option<&Value>) -> Result<HeaderMap> {
    let map = match payload {
        None => return Ok(HeaderMap::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(Error::Serialize {
                detail: format!("headers segment must serialize to an object, got {other}"),
            })
        }
    };

    let mut headers = HeaderMap::new();
    for (key, value) in map {
        if value.is_null() {
            continue;
        }
        let text = scalar_text(value).ok_or_else(|| Error::Serialize {
            detail: format!("header {key:?} must be a scalar, got {value}"),
        })?;
        let name = HeaderName::try_from(key.as_str()).map_err(|e| Error::Serialize {
            detail: format!("invalid header name {key:?}: {e}"),
        })?;
        let header_value = HeaderValue::try_from(text.as_str()).map_err(|e| Error::Serialize {
            detail: format!("invalid value for header {key:?}: {e}"),
        })?;
        headers.insert(name, header_value);
    }
    Ok(headers)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
