//! End-to-end run scenarios through the HTTP surface.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{create_workflow, poll_run, request, start_run, test_app};

#[tokio::test]
async fn hello_start_node_emits_payload() {
    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "hello",
        json!({
            "nodes": [{"id": "s", "type": "start", "settings": {"payload": {"hello": "world"}}}],
            "edges": []
        }),
    )
    .await;

    let run_id = start_run(&app, wf, None).await;
    let run = poll_run(&app, run_id).await;

    assert_eq!(run["status"], "succeeded");
    assert_eq!(run["outputs"]["s"], json!({"hello": "world"}));
    assert_eq!(run["trigger_type"], "manual");
    assert!(run["started_at"].is_string());
    assert!(run["finished_at"].is_string());
}

#[tokio::test]
async fn uppercase_transforms_text() {
    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "uppercase",
        json!({
            "nodes": [{"id": "u", "type": "transform.uppercase", "settings": {"text": "foo"}}],
            "edges": []
        }),
    )
    .await;

    let run = poll_run(&app, start_run(&app, wf, None).await).await;
    assert_eq!(run["status"], "succeeded");
    assert_eq!(run["outputs"]["u"]["text"], "FOO");
}

#[tokio::test]
async fn template_chain_renders_upstream_outputs() {
    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "chain",
        json!({
            "nodes": [
                {"id": "s", "type": "start", "settings": {"payload": {"name": "Alice"}}},
                {"id": "t", "type": "transform.template", "settings": {"template": "Hello {{ s.name }}"}},
                {"id": "u", "type": "transform.uppercase", "settings": {"text": "{{ t.text }}"}}
            ],
            "edges": [
                {"id": "e1", "from": "s", "to": "t"},
                {"id": "e2", "from": "t", "to": "u"}
            ]
        }),
    )
    .await;

    let run = poll_run(&app, start_run(&app, wf, None).await).await;
    assert_eq!(run["status"], "succeeded");
    assert_eq!(run["outputs"]["t"]["text"], "Hello Alice");
    assert_eq!(run["outputs"]["u"]["text"], "HELLO ALICE");
}

#[tokio::test]
async fn math_add_sums_settings() {
    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "add",
        json!({
            "nodes": [{"id": "m", "type": "math.add", "settings": {"a": 1, "b": 2}}],
            "edges": []
        }),
    )
    .await;

    let run = poll_run(&app, start_run(&app, wf, None).await).await;
    assert_eq!(run["status"], "succeeded");
    assert_eq!(run["outputs"]["m"]["result"], json!(3.0));
}

#[tokio::test]
async fn json_get_extracts_nested_value_and_nulls_missing_paths() {
    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "jsonget",
        json!({
            "nodes": [
                {"id": "j", "type": "json.get",
                 "settings": {"source": {"a": {"b": {"c": 42}}}, "path": ["a", "b", "c"]}},
                {"id": "missing", "type": "json.get",
                 "settings": {"source": {"a": 1}, "path": ["nope", "deeper"]}}
            ],
            "edges": []
        }),
    )
    .await;

    let run = poll_run(&app, start_run(&app, wf, None).await).await;
    assert_eq!(run["status"], "succeeded");
    assert_eq!(run["outputs"]["j"]["value"], 42);
    assert_eq!(run["outputs"]["missing"]["value"], Value::Null);
}

#[tokio::test]
async fn failing_node_fails_the_run_with_partial_outputs() {
    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "failure",
        json!({
            "nodes": [
                {"id": "A", "type": "start", "settings": {"payload": {"ok": 1}}},
                {"id": "B", "type": "transform.template", "settings": {"template": "{{ ghost.var }}"}},
                {"id": "C", "type": "show", "settings": {}}
            ],
            "edges": [
                {"id": "e1", "from": "A", "to": "B"},
                {"id": "e2", "from": "B", "to": "C"}
            ]
        }),
    )
    .await;

    let run_id = start_run(&app, wf, None).await;
    let run = poll_run(&app, run_id).await;

    assert_eq!(run["status"], "failed");
    assert_eq!(run["outputs"]["A"]["ok"], 1);
    assert!(run["outputs"].get("B").is_none());
    assert!(run["outputs"].get("C").is_none());

    let (status, logs) = request(&app, "GET", &format!("/runs/{run_id}/logs"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let messages: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|l| l["message"].as_str())
        .collect();
    assert!(messages.iter().any(|m| m.starts_with("Node B failed:")));
    // C never started.
    assert!(!messages.iter().any(|m| *m == "Starting node C"));
}

#[tokio::test]
async fn agent_with_calculator_tool_answers_offline() {
    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "agent",
        json!({
            "nodes": [
                {"id": "agent1", "type": "agent.react",
                 "settings": {"prompt": "compute (12+7)*3", "max_steps": 4}},
                {"id": "calculator", "type": "tool.calculator", "settings": {}}
            ],
            "edges": [
                {"id": "e1", "from": "agent1", "to": "calculator", "kind": "tool"}
            ]
        }),
    )
    .await;

    let run_id = start_run(&app, wf, None).await;
    let run = poll_run(&app, run_id).await;

    assert_eq!(run["status"], "succeeded");
    let final_text = run["outputs"]["agent1"]["final"].as_str().unwrap();
    assert!(final_text.contains("57"), "final was {final_text:?}");
    assert!(!run["outputs"]["agent1"]["trace"].as_array().unwrap().is_empty());
    // The calculator executed only inside the agent.
    assert!(run["outputs"].get("calculator").is_none());

    let (_, logs) = request(&app, "GET", &format!("/runs/{run_id}/logs"), None, None).await;
    let messages: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|l| l["message"].as_str())
        .collect();
    assert!(messages
        .iter()
        .any(|m| m.starts_with("Skipping tool node calculator")));
    assert!(messages
        .iter()
        .any(|m| m.contains("invoking tool calculator")));
}

#[tokio::test]
async fn webhook_trigger_feeds_start_payload() {
    let app = test_app().await;
    let (status, body) = request(
        &app,
        "POST",
        "/workflows",
        Some(json!({
            "name": "hooked",
            "webhook_slug": "my-hook",
            "graph": {
                "nodes": [{"id": "s", "type": "start", "settings": {}}],
                "edges": []
            }
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");

    let (status, response) = request(
        &app,
        "POST",
        "/hooks/my-hook",
        Some(json!({"payload": {"event": "ping"}})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let run_id = response["id"].as_i64().unwrap();

    let run = poll_run(&app, run_id).await;
    assert_eq!(run["status"], "succeeded");
    assert_eq!(run["trigger_type"], "webhook");
    assert_eq!(run["outputs"]["s"]["event"], "ping");

    let (status, _) = request(
        &app,
        "POST",
        "/hooks/no-such-hook",
        Some(json!({"payload": {}})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn start_input_reaches_the_trigger_payload() {
    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "manual-input",
        json!({
            "nodes": [{"id": "s", "type": "start", "settings": {}}],
            "edges": []
        }),
    )
    .await;

    let run = poll_run(
        &app,
        start_run(&app, wf, Some(json!({"question": "why"}))).await,
    )
    .await;
    assert_eq!(run["outputs"]["s"]["question"], "why");
}

#[tokio::test]
async fn logs_page_with_after_id_cursor() {
    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "logs",
        json!({
            "nodes": [
                {"id": "s", "type": "start", "settings": {"payload": {"x": 1}}},
                {"id": "sink", "type": "show", "settings": {}}
            ],
            "edges": [{"id": "e1", "from": "s", "to": "sink"}]
        }),
    )
    .await;

    let run_id = start_run(&app, wf, None).await;
    poll_run(&app, run_id).await;

    let (status, logs) = request(&app, "GET", &format!("/runs/{run_id}/logs"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = logs.as_array().unwrap();
    assert!(entries.len() >= 4, "expected several log entries");

    // Ids are strictly increasing.
    let ids: Vec<i64> = entries.iter().map(|e| e["id"].as_i64().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    // Entries for node s all precede entries for node sink.
    let pos_s = entries
        .iter()
        .rposition(|e| e["node_id"] == "s")
        .expect("logs for s");
    let pos_sink = entries
        .iter()
        .position(|e| e["node_id"] == "sink")
        .expect("logs for sink");
    assert!(pos_s < pos_sink);

    // Cursor past the last id yields nothing.
    let last = ids.last().unwrap();
    let (_, rest) = request(
        &app,
        "GET",
        &format!("/runs/{run_id}/logs?after_id={last}"),
        None,
        None,
    )
    .await;
    assert!(rest.as_array().unwrap().is_empty());

    // Cursor in the middle returns the tail only.
    let (_, tail) = request(
        &app,
        "GET",
        &format!("/runs/{run_id}/logs?after_id={}", ids[0]),
        None,
        None,
    )
    .await;
    assert_eq!(tail.as_array().unwrap().len(), entries.len() - 1);
}

#[tokio::test]
async fn current_node_id_reports_the_executing_node() {
    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "slow",
        json!({
            "nodes": [
                {"id": "s", "type": "start", "settings": {}},
                {"id": "z", "type": "util.sleep", "settings": {"seconds": 1.0}}
            ],
            "edges": [{"id": "e1", "from": "s", "to": "z"}]
        }),
    )
    .await;

    let run_id = start_run(&app, wf, None).await;

    let mut saw_sleeping = false;
    for _ in 0..250 {
        let (_, run) = request(&app, "GET", &format!("/runs/{run_id}"), None, None).await;
        if run["status"] == "running" && run["current_node_id"] == "z" {
            saw_sleeping = true;
        }
        let status = run["status"].as_str().unwrap_or_default();
        if status == "succeeded" || status == "failed" {
            assert_eq!(run["status"], "succeeded");
            assert!(run["current_node_id"].is_null());
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(saw_sleeping, "never observed the sleep node as current");
}

#[tokio::test]
async fn log_stream_replays_frames_and_ends_on_terminal_status() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "stream",
        json!({
            "nodes": [
                {"id": "s", "type": "start", "settings": {"payload": {"x": 1}}},
                {"id": "sink", "type": "show", "settings": {}}
            ],
            "edges": [{"id": "e1", "from": "s", "to": "sink"}]
        }),
    )
    .await;
    let run_id = start_run(&app, wf, None).await;
    poll_run(&app, run_id).await;

    // The run is terminal, so the stream replays everything and ends.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/runs/{run_id}/logs/stream"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .starts_with("text/event-stream"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    let frames: Vec<Value> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter_map(|payload| serde_json::from_str(payload).ok())
        .collect();

    assert!(frames.iter().any(|f| f["type"] == "log"));
    assert!(frames
        .iter()
        .any(|f| f["type"] == "node_started" && f["node_id"] == "s"));
    assert!(frames
        .iter()
        .any(|f| f["type"] == "node_finished" && f["node_id"] == "sink"));
    assert_eq!(
        frames.last().map(|f| f["type"].clone()),
        Some(json!("status"))
    );
    assert_eq!(frames.last().unwrap()["status"], "succeeded");
}

#[tokio::test]
async fn branch_emits_condition_for_downstream_templating() {
    let app = test_app().await;
    let wf = create_workflow(
        &app,
        "branch",
        json!({
            "nodes": [
                {"id": "s", "type": "start", "settings": {"payload": {"n": 5}}},
                {"id": "b", "type": "control.branch", "settings": {"expression": "{{ s.n > 3 }}"}}
            ],
            "edges": [{"id": "e1", "from": "s", "to": "b"}]
        }),
    )
    .await;

    let run = poll_run(&app, start_run(&app, wf, None).await).await;
    assert_eq!(run["status"], "succeeded");
    assert_eq!(run["outputs"]["b"]["condition"], true);
}
