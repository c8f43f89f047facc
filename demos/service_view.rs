//! Example of serving the same specs that drive a client.
//!
//! This example shows how to:
//! - Reuse `ApiSpec` declarations on the server side
//! - Wrap handler functions in servlets with schema enforcement
//! - Dispatch decomposed requests through a `Service`, the way a host
//!   web framework would
//!
//! Run with: `cargo run --example service_view`

use apiweave::{
    to_fields, ApiSpec, Error, MetaSchema, ObjectSchema, SegmentMap, Service, Servlet,
    BODY_SEGMENT, QUERY_SEGMENT,
};
use http::Method;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

fn translate_api() -> Result<ApiSpec, Error> {
    let input = MetaSchema::builder()
        .segment(QUERY_SEGMENT, ObjectSchema::new().required("id"))
        .build()?;
    let output = MetaSchema::builder()
        .segment(BODY_SEGMENT, ObjectSchema::new().required("id"))
        .build()?;
    Ok(ApiSpec::get("translate", input, output))
}

fn add_translation_api() -> Result<ApiSpec, Error> {
    let input = MetaSchema::builder()
        .segment(
            BODY_SEGMENT,
            ObjectSchema::new().required("from_id").required("to_id"),
        )
        .build()?;
    let output = MetaSchema::builder()
        .segment(BODY_SEGMENT, ObjectSchema::new().required("ok"))
        .build()?;
    Ok(ApiSpec::post("translate/add", input, output))
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("apiweave=debug,service_view=info")
        .init();

    let mapping: Arc<Mutex<BTreeMap<String, Value>>> = Arc::default();

    let lookup = Arc::clone(&mapping);
    let translate = Servlet::new(translate_api()?, move |fields| {
        let id = fields.get("id").cloned().unwrap_or(Value::Null);
        let translated = lookup
            .lock()
            .unwrap()
            .get(&id.to_string())
            .cloned()
            .unwrap_or(json!(0));
        to_fields(json!({ "id": translated }))
    });

    let add_translation = Servlet::new(add_translation_api()?, move |fields| {
        let from = fields.get("from_id").cloned().unwrap_or(Value::Null);
        let to = fields.get("to_id").cloned().unwrap_or(Value::Null);
        mapping.lock().unwrap().insert(from.to_string(), to);
        to_fields(json!({ "ok": true }))
    });

    let service = Service::builder()
        .servlet(translate)
        .servlet(add_translation)
        .build()?;

    // A host framework would decompose real requests into segments; here
    // the requests are built by hand.
    println!("=== GET /translate?id=7 before any mapping ===");
    let mut request = SegmentMap::new();
    request.insert(QUERY_SEGMENT.to_string(), json!({ "id": 7 }));
    let response = service.route(&Method::GET, "translate")?.handle(&request)?;
    println!("response segments: {response:?}");
    println!();

    println!("=== POST /translate/add {{7 -> 9}} ===");
    let mut request = SegmentMap::new();
    request.insert(BODY_SEGMENT.to_string(), json!({ "from_id": 7, "to_id": 9 }));
    let response = service
        .route(&Method::POST, "translate/add")?
        .handle(&request)?;
    println!("response segments: {response:?}");
    println!();

    println!("=== GET /translate?id=7 after the mapping ===");
    let mut request = SegmentMap::new();
    request.insert(QUERY_SEGMENT.to_string(), json!({ "id": 7 }));
    let response = service.route(&Method::GET, "translate")?.handle(&request)?;
    println!("response segments: {response:?}");
    println!();

    println!("=== Unknown routes are dispatch failures ===");
    match service.route(&Method::GET, "bogus") {
        Ok(_) => println!("unexpected route"),
        Err(error) => println!("{error}"),
    }

    Ok(())
}
