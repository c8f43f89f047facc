//! Service views: the server-side mirror of a client.
//!
//! The same [`ApiSpec`] that drives a client drives a [`Servlet`]: where
//! the client serializes call fields through the input schema, the
//! servlet deserializes them back out of the incoming request, hands them
//! to a handler function, and serializes the handler's result through the
//! output schema. A [`Service`] collects servlets under `(method, path)`
//! routes for a host framework to dispatch into.
//!
//! The crate stays framework-agnostic: hosts adapt their request type by
//! implementing [`SegmentSource`] and write the returned segments back
//! out however they see fit.

use std::collections::BTreeMap;
use std::fmt;

use http::Method;

use crate::meta::SegmentMap;
use crate::schema::FieldMap;
use crate::spec::ApiSpec;
use crate::{Error, Result};

/// An incoming request decomposed into named segments.
///
/// Host frameworks implement this for their request type, mapping the
/// URL's path fields, query parameters, JSON body, and headers into the
/// segment names the schemas were composed with.
pub trait SegmentSource {
    fn segments(&self) -> Result<SegmentMap>;
}

/// Segments that are already decomposed pass through unchanged.
impl SegmentSource for SegmentMap {
    fn segments(&self) -> Result<SegmentMap> {
        Ok(self.clone())
    }
}

/// One server-side operation: an [`ApiSpec`] plus the handler behind it.
pub struct Servlet {
    api_spec: ApiSpec,
    handler: Box<dyn Fn(FieldMap) -> Result<FieldMap> + Send + Sync>,
}

impl Servlet {
    /// Wraps a handler function behind an operation's schemas.
    pub fn new(
        api_spec: ApiSpec,
        handler: impl Fn(FieldMap) -> Result<FieldMap> + Send + Sync + 'static,
    ) -> Self {
        Self {
            api_spec,
            handler: Box::new(handler),
        }
    }

    /// The operation this servlet serves.
    pub fn api_spec(&self) -> &ApiSpec {
        &self.api_spec
    }

    /// Handles one request: deserialize through the input schema, invoke
    /// the handler, serialize the result through the output schema.
    ///
    /// Schema errors and handler errors propagate to the host, which
    /// decides how they map onto its wire.
    pub fn handle(&self, request: &dyn SegmentSource) -> Result<SegmentMap> {
        let fields = self.api_spec.input_schema().deserialize(&request.segments()?)?;
        tracing::debug!(path = self.api_spec.name(), "handling request");
        let response = (self.handler)(fields)?;
        self.api_spec.output_schema().serialize(&response)
    }
}

impl fmt::Debug for Servlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Servlet")
            .field("name", &self.api_spec.name())
            .field("method", &self.api_spec.method())
            .finish_non_exhaustive()
    }
}

/// A routable collection of servlets.
///
/// Routes are keyed by method and path template, exactly as the specs
/// declare them; URL pattern matching stays in the host framework.
#[derive(Debug, Default)]
pub struct Service {
    routes: BTreeMap<(String, String), Servlet>,
}

impl Service {
    /// Starts an empty service.
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::default()
    }

    /// Looks up the servlet for a method and path template.
    ///
    /// Fails with [`Error::MethodNotFound`] naming the route, mirroring
    /// how the client reports unknown operations.
    pub fn route(&self, method: &Method, name: &str) -> Result<&Servlet> {
        self.routes
            .get(&(method.as_str().to_string(), name.to_string()))
            .ok_or_else(|| Error::MethodNotFound {
                name: format!("{method} {name}"),
            })
    }

    /// All servlets, for hosts that register routes up front.
    pub fn servlets(&self) -> impl Iterator<Item = &Servlet> {
        self.routes.values()
    }
}

/// Accumulates servlets and validates routes on build.
#[derive(Debug, Default)]
pub struct ServiceBuilder {
    servlets: Vec<Servlet>,
}

impl ServiceBuilder {
    /// Adds a servlet; its route comes from its spec.
    pub fn servlet(mut self, servlet: Servlet) -> Self {
        self.servlets.push(servlet);
        self
    }

    /// Validates that no two servlets claim the same route.
    pub fn build(self) -> Result<Service> {
        let mut routes = BTreeMap::new();
        for servlet in self.servlets {
            let key = (
                servlet.api_spec().method().as_str().to_string(),
                servlet.api_spec().name().to_string(),
            );
            if routes.insert(key.clone(), servlet).is_some() {
                return Err(Error::Config(format!(
                    "route {} {} registered more than once",
                    key.0, key.1
                )));
            }
        }
        Ok(Service { routes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::JsonResponse;
    use crate::meta::MetaSchema;
    use crate::schema::{to_fields, ObjectSchema};
    use crate::transport::{build_wire_request, BODY_SEGMENT, QUERY_SEGMENT};
    use http::{HeaderMap, StatusCode};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    fn translate_api() -> ApiSpec {
        let input = MetaSchema::builder()
            .segment(QUERY_SEGMENT, ObjectSchema::new().required("id"))
            .build()
            .unwrap();
        let output = MetaSchema::builder()
            .segment(BODY_SEGMENT, ObjectSchema::new().required("translated"))
            .build()
            .unwrap();
        ApiSpec::get("translate", input, output)
    }

    fn add_api() -> ApiSpec {
        let input = MetaSchema::builder()
            .segment(
                BODY_SEGMENT,
                ObjectSchema::new().required("from_id").required("to_id"),
            )
            .build()
            .unwrap();
        let output = MetaSchema::builder()
            .segment(BODY_SEGMENT, ObjectSchema::new().required("ok"))
            .build()
            .unwrap();
        ApiSpec::post("translate/add", input, output)
    }

    fn translation_service(mapping: Arc<Mutex<BTreeMap<String, Value>>>) -> Service {
        let lookup = Arc::clone(&mapping);
        let translate = Servlet::new(translate_api(), move |fields| {
            let id = fields.get("id").cloned().unwrap_or(Value::Null);
            let translated = lookup
                .lock()
                .unwrap()
                .get(&id.to_string())
                .cloned()
                .unwrap_or(json!(0));
            to_fields(json!({ "translated": translated }))
        });

        let add = Servlet::new(add_api(), move |fields| {
            let from = fields.get("from_id").cloned().unwrap_or(Value::Null);
            let to = fields.get("to_id").cloned().unwrap_or(Value::Null);
            mapping.lock().unwrap().insert(from.to_string(), to);
            to_fields(json!({ "ok": true }))
        });

        Service::builder()
            .servlet(translate)
            .servlet(add)
            .build()
            .unwrap()
    }

    #[test]
    fn servlet_round_trips_through_both_schemas() {
        let service = translation_service(Arc::default());

        let mut request = SegmentMap::new();
        request.insert(QUERY_SEGMENT.to_string(), json!({ "id": 7 }));

        let servlet = service.route(&Method::GET, "translate").unwrap();
        let response = servlet.handle(&request).unwrap();
        assert_eq!(response.get(BODY_SEGMENT), Some(&json!({ "translated": 0 })));
    }

    #[test]
    fn handlers_observe_writes_across_requests() {
        let service = translation_service(Arc::default());

        let mut add_request = SegmentMap::new();
        add_request.insert(BODY_SEGMENT.to_string(), json!({ "from_id": 7, "to_id": 9 }));
        let response = service
            .route(&Method::POST, "translate/add")
            .unwrap()
            .handle(&add_request)
            .unwrap();
        assert_eq!(response.get(BODY_SEGMENT), Some(&json!({ "ok": true })));

        let mut request = SegmentMap::new();
        request.insert(QUERY_SEGMENT.to_string(), json!({ "id": 7 }));
        let response = service
            .route(&Method::GET, "translate")
            .unwrap()
            .handle(&request)
            .unwrap();
        assert_eq!(response.get(BODY_SEGMENT), Some(&json!({ "translated": 9 })));
    }

    #[test]
    fn what_the_client_builds_the_servlet_reads() {
        let api = add_api();
        let fields = to_fields(json!({ "from_id": 1, "to_id": 2 })).unwrap();
        let wire = build_wire_request(&api, &fields).unwrap();

        let mut segments = SegmentMap::new();
        if let Some(body) = wire.body {
            segments.insert(BODY_SEGMENT.to_string(), body);
        }

        let service = translation_service(Arc::default());
        let response = service
            .route(&Method::POST, "translate/add")
            .unwrap()
            .handle(&segments)
            .unwrap();
        assert_eq!(response.get(BODY_SEGMENT), Some(&json!({ "ok": true })));
    }

    #[test]
    fn an_http_response_feeds_a_servlet_directly() {
        let service = translation_service(Arc::default());

        let response = JsonResponse::new(
            StatusCode::OK,
            HeaderMap::new(),
            r#"{"from_id": 7, "to_id": 9}"#,
        );
        let reply = service
            .route(&Method::POST, "translate/add")
            .unwrap()
            .handle(&response)
            .unwrap();
        assert_eq!(reply.get(BODY_SEGMENT), Some(&json!({ "ok": true })));
    }

    #[test]
    fn unknown_routes_fail_like_unknown_operations() {
        let service = translation_service(Arc::default());
        let err = service.route(&Method::GET, "bogus").unwrap_err();
        assert!(matches!(err, Error::MethodNotFound { name } if name == "GET bogus"));
    }

    #[test]
    fn duplicate_routes_are_rejected() {
        let err = Service::builder()
            .servlet(Servlet::new(translate_api(), |fields| Ok(fields)))
            .servlet(Servlet::new(translate_api(), |fields| Ok(fields)))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
