//! Webhook API tests, exercising the router in-process.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use dialplane_flow_engine::config::FlowEngineConfig;
use dialplane_flow_engine::flow::BUILTIN_GREETING;
use dialplane_flow_engine::server::FlowEngineServerBuilder;

async fn create_test_router() -> (Router, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("engine.db");

    let mut config = FlowEngineConfig::default();
    config.database.database_url = format!("sqlite://{}?mode=rwc", db_path.display());
    config.general.monitor_interval_seconds = 0;

    let server = FlowEngineServerBuilder::new()
        .with_config(config)
        .build()
        .await
        .expect("Failed to build test server");
    (server.router(), temp_dir)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn entry_webhook_returns_call_id_and_gather() {
    let (router, _dir) = create_test_router().await;

    let response = router
        .oneshot(post_json(
            "/webhooks/call/entry",
            json!({
                "tenantId": "T1",
                "did": "+15551230000",
                "from": "+15559876543",
                "to": "+15551230000"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert!(!body["callId"].as_str().unwrap().is_empty());
    assert_eq!(body["action"], "gather");
    assert_eq!(body["params"]["greeting"], BUILTIN_GREETING);
    assert_eq!(body["params"]["max_digits"], 4);
}

#[tokio::test]
async fn entry_webhook_rejects_missing_fields_with_field_list() {
    let (router, _dir) = create_test_router().await;

    let response = router
        .oneshot(post_json(
            "/webhooks/call/entry",
            json!({"did": "+15551230000"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["tenantId", "from", "to"]);
}

#[tokio::test]
async fn entry_webhook_rejects_malformed_timestamp() {
    let (router, _dir) = create_test_router().await;

    let response = router
        .oneshot(post_json(
            "/webhooks/call/entry",
            json!({
                "tenantId": "T1",
                "did": "+15551230000",
                "from": "+15559876543",
                "to": "+15551230000",
                "ts": "last tuesday"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["errors"][0]["field"], "ts");
}

#[tokio::test]
async fn entry_webhook_rejects_non_string_timestamp_with_field_error() {
    // A numeric ts must produce the same 400 field-error shape as a
    // malformed string, not an extractor-level rejection.
    let (router, _dir) = create_test_router().await;

    let response = router
        .oneshot(post_json(
            "/webhooks/call/entry",
            json!({
                "tenantId": "T1",
                "did": "+15551230000",
                "from": "+15559876543",
                "to": "+15551230000",
                "ts": 1756500000
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"][0]["field"], "ts");
}

#[tokio::test]
async fn full_call_lifecycle_over_webhooks() {
    let (router, _dir) = create_test_router().await;

    let response = router
        .clone()
        .oneshot(post_json(
            "/webhooks/call/entry",
            json!({
                "tenantId": "T1",
                "did": "+15551230000",
                "from": "+15559876543",
                "to": "+15551230000"
            }),
        ))
        .await
        .unwrap();
    let entry = json_body(response).await;
    let call_id = entry["callId"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(post_json(
            "/webhooks/call/event",
            json!({
                "tenantId": "T1",
                "callId": call_id,
                "event": "no_answer"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let event = json_body(response).await;
    assert_eq!(event["action"], "voicemail");

    let response = router
        .oneshot(post_json(
            "/webhooks/call/log",
            json!({
                "tenantId": "T1",
                "callId": call_id,
                "cdr": {"billsec": 0}
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let log = json_body(response).await;
    assert_eq!(log["success"], true);
    assert_eq!(log["data"]["callId"], call_id.as_str());
    assert_eq!(log["data"]["outcome"], "voicemail");
    assert_eq!(log["data"]["tags"], json!(["voicemail"]));
    assert_eq!(log["data"]["totalSteps"], 3);
    assert_eq!(log["data"]["aiSteps"], 0);
    assert_eq!(log["data"]["apiCalls"], 0);
}

#[tokio::test]
async fn log_webhook_for_unknown_call_is_not_found() {
    let (router, _dir) = create_test_router().await;

    let response = router
        .oneshot(post_json(
            "/webhooks/call/log",
            json!({"tenantId": "T1", "callId": "never-created"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn event_webhook_requires_call_id_and_event() {
    let (router, _dir) = create_test_router().await;

    let response = router
        .oneshot(post_json("/webhooks/call/event", json!({"tenantId": "T1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["callId", "event"]);
}

#[tokio::test]
async fn health_reports_active_session_count() {
    let (router, _dir) = create_test_router().await;

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["activeSessions"], 0);
}
