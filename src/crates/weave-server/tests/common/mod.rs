//! Shared helpers for driving the router against in-memory SQLite.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use weave_server::api::routes::create_router;
use weave_server::AppState;

pub async fn test_app() -> Router {
    let state = AppState::for_tests().await;
    create_router(state)
}

/// Issue one request and decode the JSON body (Null when empty).
pub async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    user: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

pub async fn create_workflow(app: &Router, name: &str, graph: Value) -> i64 {
    let (status, body) = request(
        app,
        "POST",
        "/workflows",
        Some(serde_json::json!({"name": name, "graph": graph})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create workflow failed: {body}");
    body["id"].as_i64().expect("workflow id")
}

pub async fn start_run(app: &Router, workflow_id: i64, start_input: Option<Value>) -> i64 {
    let body = start_input.map(|input| serde_json::json!({"start_input": input}));
    let (status, response) = request(
        app,
        "POST",
        &format!("/workflows/{workflow_id}/run"),
        Some(body.unwrap_or_else(|| serde_json::json!({}))),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "start run failed: {response}");
    response["id"].as_i64().expect("run id")
}

/// Poll `/runs/:id` until the run reaches a terminal status.
pub async fn poll_run(app: &Router, run_id: i64) -> Value {
    for _ in 0..250 {
        let (status, run) = request(app, "GET", &format!("/runs/{run_id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        let run_status = run["status"].as_str().unwrap_or_default();
        if run_status == "succeeded" || run_status == "failed" {
            return run;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("run {run_id} did not finish in time");
}
