//! Example of deferred calls: requests go out immediately, blocking is
//! the caller's choice.
//!
//! This example shows how to:
//! - Run the HTTP transport on a Tokio runtime without writing async code
//! - Convert a request spec for deferred outcomes with `make_async`
//! - Overlap several in-flight calls and wait for them afterwards
//! - Bound a wait with a timeout
//!
//! Run with: `cargo run --example deferred_client`

use apiweave::{
    make_async, to_fields, ApiSpec, Client, ClientSpec, DeferredHttpTransport, Error, MetaSchema,
    ObjectSchema, RequestSpec, BODY_SEGMENT, PATH_SEGMENT,
};
use serde_json::json;
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("apiweave=debug,deferred_client=info")
        .init();

    let runtime = tokio::runtime::Runtime::new()?;

    let input = MetaSchema::builder()
        .segment(PATH_SEGMENT, ObjectSchema::new().required("id"))
        .build()?;
    let output = MetaSchema::builder()
        .segment(
            BODY_SEGMENT,
            ObjectSchema::new().required("id").required("title"),
        )
        .build()?;

    let transport = DeferredHttpTransport::with_handle(
        "https://jsonplaceholder.typicode.com",
        runtime.handle().clone(),
    )?;
    let client = Client::builder(transport)
        .operation(
            "get_post",
            ClientSpec::new(
                ApiSpec::get("posts/{id}", input, output),
                make_async(&RequestSpec::http_default()),
            ),
        )
        .build()?;

    println!("=== Overlapping calls ===");
    let started = Instant::now();
    // Each call dispatches its request and returns without blocking.
    let mut pending: Vec<_> = (1..=3)
        .map(|id| client.call("get_post", to_fields(json!({ "id": id })).unwrap()))
        .collect::<Result<_, _>>()?;
    println!("3 requests in flight after {:?}", started.elapsed());

    for deferred in &mut pending {
        let post = deferred.wait()?;
        println!("post {}: {}", post["id"], post["title"]);
    }
    println!("all resolved after {:?}", started.elapsed());
    println!();

    println!("=== Bounded waits ===");
    let mut deferred = client.call("get_post", to_fields(json!({ "id": 4 }))?)?;
    match deferred.wait_timeout(Duration::from_millis(1)) {
        Ok(post) => println!("fast response: {}", post["title"]),
        Err(Error::Timeout) => {
            println!("not ready within 1ms, waiting patiently now");
            let post = deferred.wait_timeout(Duration::from_secs(10))?;
            println!("resolved on the second wait: {}", post["title"]);
        }
        Err(error) => println!("call failed: {error}"),
    }

    Ok(())
}
