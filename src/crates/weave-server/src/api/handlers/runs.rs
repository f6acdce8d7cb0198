//! Run triggering, inspection, log paging and SSE streaming.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::current_user;
use crate::api::error::{ApiError, ApiResult};
use crate::db::repositories::{LogRepository, NodeRunRepository, RunRepository, WorkflowRepository};
use crate::engine::orchestrator::create_and_start_run;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StartRunRequest {
    #[serde(default)]
    pub start_input: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    #[serde(default)]
    pub workflow_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub after_id: Option<i64>,
}

/// POST /workflows/:id/run — manual trigger.
pub async fn start_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(workflow_id): Path<i64>,
    body: Option<Json<StartRunRequest>>,
) -> ApiResult<Json<Value>> {
    let user = current_user(&headers);
    WorkflowRepository::get_visible(&state.pool, workflow_id, user.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Workflow not found".to_string()))?;

    let payload = body
        .and_then(|Json(req)| req.start_input)
        .unwrap_or_else(|| json!({}));
    let run_id = create_and_start_run(&state, workflow_id, "manual", payload, user).await?;
    Ok(Json(json!({ "id": run_id })))
}

/// GET /runs
pub async fn list_runs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListRunsQuery>,
) -> ApiResult<Json<Value>> {
    let user = current_user(&headers);
    if let Some(status) = &query.status {
        if !["pending", "running", "succeeded", "failed"].contains(&status.as_str()) {
            return Err(ApiError::BadRequest("Invalid status".to_string()));
        }
    }
    let limit = query.limit.unwrap_or(100).clamp(1, 100);
    let runs = RunRepository::list_visible(
        &state.pool,
        user.as_deref(),
        query.workflow_id,
        query.status.as_deref(),
        limit,
    )
    .await?;

    let items: Vec<Value> = runs
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "workflow_id": r.workflow_id,
                "status": r.status,
                "started_at": r.started_at,
                "finished_at": r.finished_at,
                "trigger_type": r.trigger_type,
            })
        })
        .collect();
    Ok(Json(Value::Array(items)))
}

/// GET /runs/:id — status plus the currently executing node (the most
/// recent NodeRun without a `finished_at`).
pub async fn get_run(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(run_id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let user = current_user(&headers);
    let run = RunRepository::get_visible(&state.pool, run_id, user.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Run not found".to_string()))?;
    let current_node_id = NodeRunRepository::current_node_id(&state.pool, run.id).await?;

    Ok(Json(json!({
        "id": run.id,
        "workflow_id": run.workflow_id,
        "status": run.status,
        "started_at": run.started_at,
        "finished_at": run.finished_at,
        "trigger_type": run.trigger_type,
        "outputs": run.outputs_value(),
        "current_node_id": current_node_id,
    })))
}

/// GET /runs/:id/logs?after_id=N — incremental log page.
pub async fn get_run_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(run_id): Path<i64>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<Value>> {
    let user = current_user(&headers);
    RunRepository::get_visible(&state.pool, run_id, user.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Run not found".to_string()))?;

    let entries = LogRepository::list_after(&state.pool, run_id, query.after_id.unwrap_or(0))
        .await?;
    let items: Vec<Value> = entries.iter().map(|e| e.to_wire()).collect();
    Ok(Json(Value::Array(items)))
}

/// GET /runs/:id/logs/stream — SSE frames until the run reaches a
/// terminal status. A ~1s polling cadence over the log-id cursor is
/// plenty for human observers and keeps the reader decoupled from the
/// executor's session.
pub async fn stream_run_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(run_id): Path<i64>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let user = current_user(&headers);
    RunRepository::get_visible(&state.pool, run_id, user.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Run not found".to_string()))?;

    let pool = state.pool.clone();
    let stream = async_stream::stream! {
        let mut last_id = 0i64;
        let mut last_status: Option<String> = None;
        loop {
            let rows = LogRepository::list_after(&pool, run_id, last_id)
                .await
                .unwrap_or_default();
            for row in rows {
                last_id = last_id.max(row.id);
                let message = row.message.clone();
                let node_id = row.node_id.clone();
                yield Ok::<Event, Infallible>(sse_json(json!({"type": "log", "entry": row.to_wire()})));

                // Node lifecycle events are derived from the
                // executor's well-known log messages.
                if let Some(node_id) = node_id {
                    if message.starts_with("Starting node") {
                        yield Ok(sse_json(json!({"type": "node_started", "node_id": node_id})));
                    } else if message.starts_with("Finished node") {
                        yield Ok(sse_json(json!({"type": "node_finished", "node_id": node_id})));
                    } else if message.contains("failed") {
                        yield Ok(sse_json(json!({"type": "node_failed", "node_id": node_id})));
                    }
                }
            }

            match RunRepository::get_by_id(&pool, run_id).await {
                Ok(Some(run)) => {
                    if last_status.as_deref() != Some(run.status.as_str()) {
                        last_status = Some(run.status.clone());
                        yield Ok(sse_json(json!({"type": "status", "status": run.status})));
                    }
                    if run.is_terminal() {
                        break;
                    }
                }
                _ => {
                    yield Ok(sse_json(json!({"type": "status", "status": "not_found"})));
                    break;
                }
            }

            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn sse_json(value: Value) -> Event {
    Event::default()
        .json_data(&value)
        .unwrap_or_else(|_| Event::default().data("{}"))
}
