//! Example of a blocking HTTP client assembled from declarative specs.
//!
//! This example shows how to:
//! - Declare operations as path templates plus segmented schemas
//! - Register them on a client over one transport
//! - Call with field maps or with typed arguments
//! - Distinguish permanent from transient failures
//!
//! Run with: `cargo run --example http_client`

use apiweave::{
    to_fields, ApiSpec, Client, ClientSpec, Error, HttpTransport, MetaSchema, ObjectSchema,
    RequestSpec, ValueSchema, BODY_SEGMENT, PATH_SEGMENT, QUERY_SEGMENT,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Serialize)]
struct GetPost {
    id: u32,
}

#[derive(Deserialize, Debug)]
struct Post {
    id: u32,
    title: String,
}

fn main() -> Result<(), Error> {
    // Initialize tracing to see dispatch and retry events
    tracing_subscriber::fmt()
        .with_env_filter("apiweave=debug,http_client=info")
        .init();

    let get_post_input = MetaSchema::builder()
        .segment(PATH_SEGMENT, ObjectSchema::new().required("id"))
        .build()?;
    let list_posts_input = MetaSchema::builder()
        .segment(QUERY_SEGMENT, ObjectSchema::new().optional("userId"))
        .build()?;
    let post_output = MetaSchema::builder()
        .segment(
            BODY_SEGMENT,
            ObjectSchema::new().required("id").required("title"),
        )
        .build()?;
    let raw_output = MetaSchema::builder()
        .segment(BODY_SEGMENT, ValueSchema::new("posts"))
        .build()?;

    let client = Client::builder(HttpTransport::new("https://jsonplaceholder.typicode.com")?)
        .operation(
            "get_post",
            ClientSpec::new(
                ApiSpec::get("posts/{id}", get_post_input, post_output),
                RequestSpec::http_default(),
            ),
        )
        .operation(
            "list_posts",
            ClientSpec::new(
                ApiSpec::get("posts", list_posts_input, raw_output),
                RequestSpec::http_default(),
            ),
        )
        .build()?;

    println!("=== Field-map call ===");
    let post = client.call("get_post", to_fields(json!({ "id": 1 }))?)?;
    println!("post 1 title: {}", post["title"]);
    println!();

    println!("=== Typed call ===");
    let post: Post = client.call_as("get_post", &GetPost { id: 2 })?;
    println!("post {}: {}", post.id, post.title);
    println!();

    println!("=== Query parameters ===");
    let posts = client.call("list_posts", to_fields(json!({ "userId": 1 }))?)?;
    if let Some(serde_json::Value::Array(items)) = posts.get("posts") {
        println!("user 1 wrote {} posts", items.len());
    }
    println!();

    println!("=== Permanent failures are not retried ===");
    match client.call("get_post", to_fields(json!({ "id": 999_999 }))?) {
        Ok(post) => println!("unexpected success: {post:?}"),
        Err(Error::NotFound { detail }) => println!("no such post: {detail}"),
        Err(error) if error.is_transient() => println!("gave up after retries: {error}"),
        Err(error) => println!("call failed: {error}"),
    }

    Ok(())
}
