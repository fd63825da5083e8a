use std::sync::{Arc, Mutex};

use pantalone::{
    hyper::Method, InterceptedRequest, MockServer, RequestExt, RequestMatch, ResourceSchema,
    ResponseExt,
};
use serde_json::{json, Value};

use crate::helpers::{random_path, request, send_empty};

fn server() -> MockServer {
    MockServer::new(ResourceSchema::default())
}

async fn assert_expectation_behaviour(method: Method) {
    let path = random_path();

    let mut fulfilled = server();
    fulfilled.expect(method.clone(), &path);
    send_empty(&fulfilled.client(), method.clone(), &path).await;
    assert_eq!(fulfilled.checkpoint(), Ok(()));

    let mut unfulfilled = server();
    unfulfilled.expect(method.clone(), &path);
    let err = unfulfilled.checkpoint().unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Expected {} {} to have been requested.", method, path)
    );
    assert_eq!(unfulfilled.pending_expectations(), 0);
}

#[tokio::test]
async fn should_check_get_expectations() {
    assert_expectation_behaviour(Method::GET).await;
}

#[tokio::test]
async fn should_check_put_expectations() {
    assert_expectation_behaviour(Method::PUT).await;
}

#[tokio::test]
async fn should_check_patch_expectations() {
    assert_expectation_behaviour(Method::PATCH).await;
}

#[tokio::test]
async fn should_check_post_expectations() {
    assert_expectation_behaviour(Method::POST).await;
}

#[tokio::test]
async fn should_check_delete_expectations() {
    assert_expectation_behaviour(Method::DELETE).await;
}

#[tokio::test]
async fn should_report_exact_message_for_unrequested_path() {
    let mut server = server();
    server.expect(Method::GET, "/foo");

    let err = server.checkpoint().unwrap_err();

    assert_eq!(err.to_string(), "Expected GET /foo to have been requested.");
}

#[tokio::test]
async fn should_pass_when_all_requests_are_made() {
    let mut server = server();
    server.expect(Method::GET, "/foo");
    server.expect(Method::GET, "/bar");
    let client = server.client();

    let (foo, bar) = tokio::join!(
        send_empty(&client, Method::GET, "/foo"),
        send_empty(&client, Method::GET, "/bar")
    );

    assert_eq!(foo.status(), 200);
    assert_eq!(bar.status(), 200);
    assert_eq!(server.checkpoint(), Ok(()));
}

#[tokio::test]
async fn should_list_only_unmet_expectations() {
    let mut server = server();
    server.expect(Method::GET, "/foo");
    server.expect(Method::GET, "/bar");

    send_empty(&server.client(), Method::GET, "/foo").await;

    assert_eq!(
        server.checkpoint().unwrap_err().to_string(),
        "Expected GET /bar to have been requested."
    );
}

#[tokio::test]
async fn should_list_every_unmet_expectation_in_declaration_order() {
    let mut server = server();
    server.expect(Method::GET, "/foo");
    server.expect(Method::GET, "/bar");

    assert_eq!(
        server.checkpoint().unwrap_err().to_string(),
        "Expected GET /foo, GET /bar to have been requested."
    );
}

#[tokio::test]
async fn should_clear_expectations_after_every_checkpoint() {
    let mut server = server();
    server.expect(Method::GET, "/foo");
    assert_eq!(server.pending_expectations(), 1);

    assert!(server.checkpoint().is_err());
    assert_eq!(server.pending_expectations(), 0);
    assert_eq!(server.checkpoint(), Ok(()));

    server.expect(Method::GET, "/foo");
    send_empty(&server.client(), Method::GET, "/foo").await;
    assert_eq!(server.checkpoint(), Ok(()));
    assert_eq!(server.checkpoint(), Ok(()));
}

#[tokio::test]
async fn should_stub_a_response_for_expected_requests() {
    let mut server = server();
    server.expect_responding(Method::POST, "/apps", Some(json!({ "foo": "bar" })), 201);

    let response = send_empty(&server.client(), Method::POST, "/apps").await;

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "foo": "bar" }));
    assert_eq!(server.checkpoint(), Ok(()));
}

#[tokio::test]
async fn should_match_form_data_against_request_body() {
    let mut server = server();
    server
        .expect(Method::POST, "/apps")
        .with(RequestMatch::new().data([("foo", "bar"), ("baz", "qux")]));

    let request = request(Method::POST, "/apps")
        .form([("foo", "bar"), ("baz", "qux")])
        .unwrap();
    server.client().send(request).await.unwrap();

    assert_eq!(server.checkpoint(), Ok(()));
}

#[tokio::test]
async fn should_describe_body_when_body_does_not_match() {
    let mut server = server();
    server
        .expect(Method::POST, "/apps")
        .with(RequestMatch::new().data([("foo", "bar"), ("baz", "qux")]));

    let request = request(Method::POST, "/apps").form([("foo", "bar")]).unwrap();
    server.client().send(request).await.unwrap();

    assert_eq!(
        server.checkpoint().unwrap_err().to_string(),
        "Expected POST /apps with body: foo=bar&baz=qux to have been requested."
    );
}

#[tokio::test]
async fn should_match_json_body_exactly() {
    let mut server = server();
    server
        .expect(Method::PATCH, "/apps/1")
        .with(RequestMatch::new().body(r#"{"name":"demo"}"#));

    let request = request(Method::PATCH, "/apps/1")
        .json(json!({ "name": "demo" }))
        .unwrap();
    server.client().send(request).await.unwrap();

    assert_eq!(server.checkpoint(), Ok(()));
}

#[tokio::test]
async fn should_match_header_subset() {
    let mut server = server();
    server
        .expect(Method::GET, "/apps")
        .with(RequestMatch::new().header("Accept", "application/json"));

    let request = request(Method::GET, "/apps")
        .header("Accept", "application/json")
        .header("X-Request-Id", "abc")
        .empty()
        .unwrap();
    server.client().send(request).await.unwrap();

    assert_eq!(server.checkpoint(), Ok(()));
}

#[tokio::test]
async fn should_fail_when_expected_header_value_is_absent() {
    let mut server = server();
    server
        .expect(Method::GET, "/apps")
        .with(RequestMatch::new().header("Accept", "application/json"));

    let request = request(Method::GET, "/apps")
        .header("Accept", "text/html")
        .empty()
        .unwrap();
    server.client().send(request).await.unwrap();

    assert_eq!(
        server.checkpoint().unwrap_err().to_string(),
        r#"Expected GET /apps with headers: {"Accept":"application/json"} to have been requested."#
    );
}

fn recorder() -> (
    Arc<Mutex<Vec<InterceptedRequest>>>,
    impl FnMut(&InterceptedRequest) + Send + 'static,
) {
    let seen = Arc::new(Mutex::new(vec![]));
    let sink = seen.clone();
    (seen, move |request: &InterceptedRequest| {
        sink.lock().unwrap().push(request.clone())
    })
}

#[tokio::test]
async fn should_invoke_callback_once_when_fulfilled() {
    let (seen, callback) = recorder();
    let mut server = server();
    server.expect(Method::GET, "/foo").with(callback);
    let client = server.client();

    send_empty(&client, Method::GET, "/foo").await;
    send_empty(&client, Method::GET, "/foo").await;
    assert_eq!(server.checkpoint(), Ok(()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::GET);
    assert_eq!(seen[0].url, "/foo");
}

#[tokio::test]
async fn should_invoke_callback_given_with_request_match() {
    let (seen, callback) = recorder();
    let mut server = server();
    server
        .expect(Method::POST, "/foo")
        .with_callback(RequestMatch::new(), callback);

    let request = request(Method::POST, "/foo").form([("a", "1")]).unwrap();
    server.client().send(request).await.unwrap();
    assert_eq!(server.checkpoint(), Ok(()));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].body.as_deref(), Some("a=1"));
}

#[tokio::test]
async fn should_not_invoke_callback_when_unfulfilled() {
    let (seen, callback) = recorder();
    let mut server = server();
    server.expect(Method::GET, "/foo").with(callback);

    send_empty(&server.client(), Method::GET, "/bar").await;

    assert!(server.checkpoint().is_err());
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_route_and_match_expectations_with_query_strings() {
    let mut server = server();
    server.expect(Method::GET, "/foo?bar=1");
    let client = server.client();

    let response = send_empty(&client, Method::GET, "/foo?bar=1").await;

    assert_eq!(response.status(), 200);
    assert_eq!(server.handled_requests().len(), 1);
    assert!(server.unhandled_requests().is_empty());
    assert_eq!(server.checkpoint(), Ok(()));
}

#[tokio::test]
async fn should_require_the_exact_query_string() {
    let mut server = server();
    server.expect(Method::GET, "/foo?bar=1");

    let response = send_empty(&server.client(), Method::GET, "/foo?bar=2").await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        server.checkpoint().unwrap_err().to_string(),
        "Expected GET /foo?bar=1 to have been requested."
    );
}
