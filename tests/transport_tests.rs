//! End-to-end transport behavior over the full router.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use relaymcp::mcp::session::Frame;
use relaymcp::mcp::transport::app;
use relaymcp::test_utils::test_state;

fn post_message(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

#[tokio::test]
async fn health_endpoint_reports_identity_and_endpoints() {
    let app = app(test_state());
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let body = json_body(response).await;
    assert_eq!(body["name"], json!("relaymcp"));
    assert_eq!(body["status"], json!("running"));
    assert_eq!(body["endpoints"]["sse"], json!("/sse"));
}

#[tokio::test]
async fn malformed_body_is_a_400_parse_error_without_id() {
    let app = app(test_state());
    let response = app
        .oneshot(post_message("/sse/message", "not-json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], json!(-32700));
    assert!(body.get("id").is_none(), "parse errors carry no id field");
}

#[tokio::test]
async fn initialize_round_trips_synchronously() {
    let app = app(test_state());
    let response = app
        .oneshot(post_message(
            "/sse/message",
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["jsonrpc"], json!("2.0"));
    assert_eq!(body["id"], json!(1));
    assert_eq!(body["result"]["protocolVersion"], json!("2024-11-05"));
    assert_eq!(body["result"]["capabilities"], json!({"tools": {}}));
    assert!(body["result"]["serverInfo"].is_object());
}

#[tokio::test]
async fn tools_call_add_returns_the_formatted_sum() {
    let app = app(test_state());
    let response = app
        .oneshot(post_message(
            "/sse/message",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"add","arguments":{"a":2,"b":3}}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["result"]["content"][0]["text"], json!("2 + 3 = 5"));
}

#[tokio::test]
async fn unknown_tool_is_a_200_with_an_error_envelope() {
    let app = app(test_state());
    let response = app
        .oneshot(post_message(
            "/sse/message",
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nope"}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], json!(-32601));
    assert!(body["error"]["message"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn initialized_notification_is_204_with_no_body() {
    let app = app(test_state());
    let response = app
        .oneshot(post_message(
            "/sse/message",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn notification_is_204_on_the_fallback_path_too() {
    let app = app(test_state());
    let response = app
        .oneshot(post_message(
            "/sse",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn fallback_post_to_stream_open_path_dispatches_statelessly() {
    let app = app(test_state());
    let response = app
        .oneshot(post_message(
            "/sse",
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], json!(7));
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_session_id_still_dispatches_synchronously() {
    let app = app(test_state());
    let response = app
        .oneshot(post_message(
            "/sse/message?sessionId=deadbeefdeadbeefdeadbeefdeadbeef",
            r#"{"jsonrpc":"2.0","id":8,"method":"initialize","params":{}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], json!(8));
    assert!(body["result"].is_object());
}

#[tokio::test]
async fn session_bound_post_delivers_on_both_paths() {
    let state = test_state();
    let app = app(state.clone());

    // Open a session the way the SSE handler does, keeping the stream half.
    let (session, mut rx) = state.sessions.create().await;
    let uri = format!("/sse/message?sessionId={}", session.id());

    let response = app
        .oneshot(post_message(
            &uri,
            r#"{"jsonrpc":"2.0","id":9,"method":"tools/call","params":{"name":"add","arguments":{"a":4,"b":6}}}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sync_body = json_body(response).await;
    assert_eq!(sync_body["result"]["content"][0]["text"], json!("4 + 6 = 10"));

    // The same envelope shows up as a data frame after the handshake.
    assert!(matches!(rx.recv().await, Some(Frame::Endpoint { .. })));
    match rx.recv().await {
        Some(Frame::Message(frame)) => {
            let streamed: Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(streamed, sync_body);
        }
        other => panic!("expected the envelope on the stream, got: {:?}", other),
    }
}

#[tokio::test]
async fn sse_endpoint_opens_an_event_stream() {
    let state = test_state();
    let app = app(state.clone());

    let response = app
        .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(state.sessions.len().await, 1);
}

#[tokio::test]
async fn preflight_gets_permissive_cors_headers() {
    let app = app(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/sse/message")
                .header(header::ORIGIN, "https://example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty(), "preflight carries no body");
}

#[tokio::test]
async fn simple_requests_carry_the_cors_origin_header() {
    let app = app(test_state());
    let mut request = post_message(
        "/sse/message",
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
    );
    request
        .headers_mut()
        .insert(header::ORIGIN, "https://example.com".parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn missing_method_is_answered_with_null_id() {
    let app = app(test_state());
    let response = app
        .oneshot(post_message("/sse/message", r#"{"jsonrpc":"2.0","params":{}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], json!(-32601));
    assert_eq!(body.get("id"), Some(&Value::Null));
}
