//! Surface behaviors: validation, CRUD, catalog, ownership.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{create_workflow, request, test_app};

#[tokio::test]
async fn validate_graph_rejects_control_cycles() {
    let app = test_app().await;
    let (status, body) = request(
        &app,
        "POST",
        "/validate-graph",
        Some(json!({
            "graph": {
                "nodes": [
                    {"id": "a", "type": "start", "settings": {}},
                    {"id": "b", "type": "show", "settings": {}}
                ],
                "edges": [
                    {"id": "e1", "from": "a", "to": "b"},
                    {"id": "e2", "from": "b", "to": "a"}
                ]
            }
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("cycle"));
}

#[tokio::test]
async fn validate_graph_accepts_tool_only_cycles() {
    let app = test_app().await;
    let (status, body) = request(
        &app,
        "POST",
        "/validate-graph",
        Some(json!({
            "graph": {
                "nodes": [
                    {"id": "a", "type": "agent.react", "settings": {"prompt": "x"}},
                    {"id": "b", "type": "tool.calculator", "settings": {}}
                ],
                "edges": [
                    {"id": "e1", "from": "a", "to": "b", "kind": "tool"},
                    {"id": "e2", "from": "b", "to": "a", "kind": "tool"}
                ]
            }
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["valid"], true);
}

#[tokio::test]
async fn validate_graph_rejects_unknown_types_and_bad_settings() {
    let app = test_app().await;

    let (status, body) = request(
        &app,
        "POST",
        "/validate-graph",
        Some(json!({
            "graph": {
                "nodes": [{"id": "a", "type": "does.not.exist", "settings": {}}],
                "edges": []
            }
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("does.not.exist"));

    // transform.uppercase requires 'text'.
    let (status, _) = request(
        &app,
        "POST",
        "/validate-graph",
        Some(json!({
            "graph": {
                "nodes": [{"id": "u", "type": "transform.uppercase", "settings": {}}],
                "edges": []
            }
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Duplicate node ids.
    let (status, _) = request(
        &app,
        "POST",
        "/validate-graph",
        Some(json!({
            "graph": {
                "nodes": [
                    {"id": "a", "type": "start", "settings": {}},
                    {"id": "a", "type": "start", "settings": {}}
                ],
                "edges": []
            }
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn agent_tool_declarations_are_validated_at_write_time() {
    let app = test_app().await;

    // Duplicate tool names.
    let (status, body) = request(
        &app,
        "POST",
        "/validate-graph",
        Some(json!({
            "graph": {
                "nodes": [{
                    "id": "agent1", "type": "agent.react",
                    "settings": {
                        "prompt": "x",
                        "tools": [
                            {"name": "calc", "type": "tool.calculator", "settings": {}},
                            {"name": "calc", "type": "tool.calculator", "settings": {}}
                        ]
                    }
                }],
                "edges": []
            }
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("duplicate tool name"));

    // Non-tool-compatible type.
    let (status, body) = request(
        &app,
        "POST",
        "/validate-graph",
        Some(json!({
            "graph": {
                "nodes": [{
                    "id": "agent1", "type": "agent.react",
                    "settings": {
                        "prompt": "x",
                        "tools": [{"name": "up", "type": "transform.uppercase", "settings": {"text": "x"}}]
                    }
                }],
                "edges": []
            }
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("not tool-compatible"));
}

#[tokio::test]
async fn workflow_crud_round_trip() {
    let app = test_app().await;
    let graph = json!({
        "nodes": [{"id": "s", "type": "start", "settings": {}}],
        "edges": []
    });
    let wf = create_workflow(&app, "crud", graph).await;

    let (status, body) = request(&app, "GET", &format!("/workflows/{wf}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "crud");
    assert_eq!(body["graph"]["nodes"][0]["type"], "start");

    // Update name and graph; the new graph must be valid.
    let (status, body) = request(
        &app,
        "PUT",
        &format!("/workflows/{wf}"),
        Some(json!({
            "name": "crud-2",
            "graph": {
                "nodes": [{"id": "u", "type": "transform.uppercase", "settings": {"text": "hi"}}],
                "edges": []
            }
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], true);

    let (_, body) = request(&app, "GET", &format!("/workflows/{wf}"), None, None).await;
    assert_eq!(body["name"], "crud-2");
    assert_eq!(body["graph"]["nodes"][0]["id"], "u");

    // Invalid replacement graph is rejected.
    let (status, _) = request(
        &app,
        "PUT",
        &format!("/workflows/{wf}"),
        Some(json!({
            "graph": {"nodes": [{"id": "x", "type": "nope", "settings": {}}], "edges": []}
        })),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Delete and confirm.
    let (status, body) = request(&app, "DELETE", &format!("/workflows/{wf}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);
    let (status, _) = request(&app, "GET", &format!("/workflows/{wf}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn creating_the_same_workflow_twice_yields_distinct_rows() {
    let app = test_app().await;
    let graph = json!({
        "nodes": [{"id": "s", "type": "start", "settings": {}}],
        "edges": []
    });
    let first = create_workflow(&app, "dup", graph.clone()).await;
    let second = create_workflow(&app, "dup", graph).await;
    assert_ne!(first, second);

    let (_, a) = request(&app, "GET", &format!("/workflows/{first}"), None, None).await;
    let (_, b) = request(&app, "GET", &format!("/workflows/{second}"), None, None).await;
    assert_eq!(a["graph"], b["graph"]);
}

#[tokio::test]
async fn duplicate_webhook_slug_conflicts() {
    let app = test_app().await;
    let graph = json!({
        "nodes": [{"id": "s", "type": "start", "settings": {}}],
        "edges": []
    });
    let (status, _) = request(
        &app,
        "POST",
        "/workflows",
        Some(json!({"name": "one", "webhook_slug": "shared-slug", "graph": graph})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(
        &app,
        "POST",
        "/workflows",
        Some(json!({"name": "two", "webhook_slug": "shared-slug", "graph": graph})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn owned_workflows_are_invisible_to_other_users() {
    let app = test_app().await;
    let (status, body) = request(
        &app,
        "POST",
        "/workflows",
        Some(json!({
            "name": "mine",
            "graph": {"nodes": [{"id": "s", "type": "start", "settings": {}}], "edges": []}
        })),
        Some("alice"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let wf = body["id"].as_i64().unwrap();

    let (status, _) = request(&app, "GET", &format!("/workflows/{wf}"), None, Some("alice")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&app, "GET", &format!("/workflows/{wf}"), None, Some("bob")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(&app, "GET", &format!("/workflows/{wf}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn block_catalog_lists_the_library() {
    let app = test_app().await;
    let (status, body) = request(&app, "GET", "/blocks", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["blocks"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    for expected in [
        "start",
        "show",
        "http.request",
        "web.get",
        "llm.simple",
        "transform.uppercase",
        "math.add",
        "json.get",
        "agent.react",
        "tool.calculator",
    ] {
        assert!(names.contains(&expected), "missing {expected}");
    }

    let (status, body) = request(&app, "GET", "/block-specs", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let specs = body["blocks"].as_array().unwrap();
    let uppercase = specs
        .iter()
        .find(|s| s["type"] == "transform.uppercase")
        .unwrap();
    assert_eq!(uppercase["kind"], "executor");
    assert!(uppercase["settings_schema"]["properties"]["text"].is_object());

    let agent = specs.iter().find(|s| s["type"] == "agent.react").unwrap();
    assert_eq!(agent["kind"], "agent");
    let calc = specs.iter().find(|s| s["type"] == "tool.calculator").unwrap();
    assert_eq!(calc["tool_compatible"], true);
}

#[tokio::test]
async fn integration_accounts_require_identity_to_write() {
    let app = test_app().await;

    let (status, _) = request(
        &app,
        "POST",
        "/integrations/accounts",
        Some(json!({"toolkit": "GMAIL", "connected_account_id": "acct-1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = request(
        &app,
        "POST",
        "/integrations/accounts",
        Some(json!({"toolkit": "GMAIL", "connected_account_id": "acct-1"})),
        Some("alice"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    let (status, body) = request(
        &app,
        "GET",
        "/integrations/accounts?toolkit=GMAIL",
        None,
        Some("alice"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Anonymous listing is empty rather than an error.
    let (status, body) = request(&app, "GET", "/integrations/accounts", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn runs_listing_filters_by_workflow_and_status() {
    let app = test_app().await;
    let graph = json!({
        "nodes": [{"id": "s", "type": "start", "settings": {}}],
        "edges": []
    });
    let wf_a = create_workflow(&app, "runs-a", graph.clone()).await;
    let wf_b = create_workflow(&app, "runs-b", graph).await;

    let run_a = common::start_run(&app, wf_a, None).await;
    let run_b = common::start_run(&app, wf_b, None).await;
    common::poll_run(&app, run_a).await;
    common::poll_run(&app, run_b).await;

    let (status, body) = request(&app, "GET", &format!("/runs?workflow_id={wf_a}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"].as_i64(), Some(run_a));

    let (status, body) = request(&app, "GET", "/runs?status=succeeded", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = request(&app, "GET", "/runs?status=exploded", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_endpoint_answers() {
    let app = test_app().await;
    let (status, body) = request(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
