//! Webhook trigger endpoint.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::{ApiError, ApiResult};
use crate::db::repositories::WorkflowRepository;
use crate::engine::orchestrator::create_and_start_run;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HookPayload {
    pub payload: Value,
}

/// POST /hooks/:slug — start a run for the workflow registered under
/// the slug. Webhooks are unauthenticated; the run inherits the
/// workflow's owner.
pub async fn webhook_trigger(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<HookPayload>,
) -> ApiResult<Json<Value>> {
    let workflow = WorkflowRepository::find_by_slug(&state.pool, &slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("Workflow not found".to_string()))?;

    let run_id = create_and_start_run(&state, workflow.id, "webhook", body.payload, None).await?;
    Ok(Json(json!({ "id": run_id })))
}
