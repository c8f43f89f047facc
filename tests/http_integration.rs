//! Integration tests driving both HTTP transports against wiremock.

use apiweave::{
    make_async, to_fields, ApiSpec, Client, ClientSpec, DeferredHttpTransport, Error,
    HttpTransport, MetaSchema, ObjectSchema, RequestSpec, BODY_SEGMENT, HEADERS_SEGMENT,
    PATH_SEGMENT, QUERY_SEGMENT,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn update_volume_api() -> ApiSpec {
    let input = MetaSchema::builder()
        .segment(PATH_SEGMENT, ObjectSchema::new().required("id"))
        .segment(QUERY_SEGMENT, ObjectSchema::new().optional("verbose"))
        .segment(HEADERS_SEGMENT, ObjectSchema::new().optional("x-request-id"))
        .segment(BODY_SEGMENT, ObjectSchema::new().optional("title"))
        .build()
        .unwrap();
    let output = MetaSchema::builder()
        .segment(
            BODY_SEGMENT,
            ObjectSchema::new().required("id").optional("title"),
        )
        .segment(HEADERS_SEGMENT, ObjectSchema::new().optional("etag"))
        .build()
        .unwrap();
    ApiSpec::post("volumes/{id}", input, output)
}

fn get_volume_api() -> ApiSpec {
    let input = MetaSchema::builder()
        .segment(PATH_SEGMENT, ObjectSchema::new().required("id"))
        .build()
        .unwrap();
    let output = MetaSchema::builder()
        .segment(
            BODY_SEGMENT,
            ObjectSchema::new().required("id").optional("title"),
        )
        .build()
        .unwrap();
    ApiSpec::get("volumes/{id}", input, output)
}

fn blocking_client(uri: &str) -> Client<HttpTransport> {
    Client::builder(HttpTransport::new(uri).unwrap())
        .operation(
            "update_volume",
            ClientSpec::new(update_volume_api(), RequestSpec::http_default()),
        )
        .operation(
            "get_volume",
            ClientSpec::new(get_volume_api(), RequestSpec::http_default()),
        )
        .build()
        .unwrap()
}

fn deferred_client(uri: &str) -> Client<DeferredHttpTransport> {
    Client::builder(DeferredHttpTransport::new(uri).unwrap())
        .operation(
            "get_volume",
            ClientSpec::new(get_volume_api(), make_async(&RequestSpec::http_default())),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn blocking_call_maps_every_segment_both_ways() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/volumes/v-1"))
        .and(query_param("verbose", "true"))
        .and(header("x-request-id", "r-9"))
        .and(body_json(json!({ "title": "Dune" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "v-1", "title": "Dune" }))
                .insert_header("etag", "abc"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let volume = tokio::task::spawn_blocking(move || {
        let client = blocking_client(&uri);
        client.call(
            "update_volume",
            to_fields(json!({
                "id": "v-1",
                "verbose": true,
                "x-request-id": "r-9",
                "title": "Dune",
            }))
            .unwrap(),
        )
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(volume.get("id"), Some(&json!("v-1")));
    assert_eq!(volume.get("title"), Some(&json!("Dune")));
    assert_eq!(volume.get("etag"), Some(&json!("abc")));
}

#[tokio::test]
async fn blocking_call_retries_until_the_service_recovers() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = Arc::clone(&hits);

    // First two attempts are turned away, the third succeeds.
    Mock::given(method("GET"))
        .and(path("/volumes/v-2"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = hits_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(503).set_body_string("down for maintenance")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({ "id": "v-2" }))
            }
        })
        .mount(&server)
        .await;

    let uri = server.uri();
    let volume = tokio::task::spawn_blocking(move || {
        blocking_client(&uri).call("get_volume", to_fields(json!({ "id": "v-2" })).unwrap())
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(volume.get("id"), Some(&json!("v-2")));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn blocking_call_returns_the_last_transient_error_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/volumes/v-3"))
        .respond_with(ResponseTemplate::new(503).set_body_string("still down"))
        .expect(3)
        .mount(&server)
        .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        blocking_client(&uri).call("get_volume", to_fields(json!({ "id": "v-3" })).unwrap())
    })
    .await
    .unwrap();

    match result {
        Err(Error::Unavailable { detail }) => {
            assert!(detail.contains("503"));
            assert!(detail.contains("still down"));
        }
        other => panic!("expected Unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn blocking_call_does_not_retry_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/volumes/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such volume"))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        blocking_client(&uri).call("get_volume", to_fields(json!({ "id": "missing" })).unwrap())
    })
    .await
    .unwrap();

    match result {
        Err(Error::NotFound { detail }) => assert!(detail.contains("no such volume")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn blocking_call_does_not_retry_bad_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/volumes/v-5"))
        .respond_with(ResponseTemplate::new(400).set_body_string("id is malformed"))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        blocking_client(&uri).call("get_volume", to_fields(json!({ "id": "v-5" })).unwrap())
    })
    .await
    .unwrap();

    match result {
        Err(Error::BadRequest { detail }) => assert!(detail.contains("id is malformed")),
        other => panic!("expected BadRequest, got {other:?}"),
    }
}

#[tokio::test]
async fn blocking_call_rejects_a_non_json_success_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/volumes/v-4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        blocking_client(&uri).call("get_volume", to_fields(json!({ "id": "v-4" })).unwrap())
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(Error::Deserialize { .. })));
}

#[tokio::test]
async fn deferred_calls_overlap_and_resolve_to_the_synchronous_outcome() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/volumes/v-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "v-1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/volumes/v-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "v-2" })))
        .mount(&server)
        .await;

    let client = deferred_client(&server.uri());

    // Both requests are in flight before anything waits.
    let first = client
        .call("get_volume", to_fields(json!({ "id": "v-1" })).unwrap())
        .unwrap();
    let second = client
        .call("get_volume", to_fields(json!({ "id": "v-2" })).unwrap())
        .unwrap();

    let (first, second) = tokio::task::spawn_blocking(move || {
        let mut first = first;
        let mut second = second;
        (first.wait(), second.wait())
    })
    .await
    .unwrap();

    assert_eq!(first.unwrap().get("id"), Some(&json!("v-1")));
    assert_eq!(second.unwrap().get("id"), Some(&json!("v-2")));
}

#[tokio::test]
async fn deferred_call_sends_once_and_classifies_at_wait_time() {
    let server = MockServer::start().await;
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_clone = Arc::clone(&hits);

    Mock::given(method("GET"))
        .and(path("/volumes/v-9"))
        .respond_with(move |_req: &wiremock::Request| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(503).set_body_string("down")
        })
        .mount(&server)
        .await;

    let client = deferred_client(&server.uri());
    let deferred = client
        .call("get_volume", to_fields(json!({ "id": "v-9" })).unwrap())
        .unwrap();

    let result = tokio::task::spawn_blocking(move || {
        let mut deferred = deferred;
        deferred.wait()
    })
    .await
    .unwrap();

    // The wire saw one request: the retry budget burns against the same
    // settled response, since a deferred attempt cannot be re-dispatched.
    assert!(matches!(result, Err(Error::Unavailable { .. })));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn deferred_call_timeout_is_recoverable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/volumes/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "slow" }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let client = deferred_client(&server.uri());
    let deferred = client
        .call("get_volume", to_fields(json!({ "id": "slow" })).unwrap())
        .unwrap();

    let outcome = tokio::task::spawn_blocking(move || {
        let mut deferred = deferred;
        let early = deferred.wait_timeout(Duration::from_millis(5));
        let late = deferred.wait_timeout(Duration::from_secs(5));
        (early, late)
    })
    .await
    .unwrap();

    assert!(matches!(outcome.0, Err(Error::Timeout)));
    assert_eq!(outcome.1.unwrap().get("id"), Some(&json!("slow")));
}
