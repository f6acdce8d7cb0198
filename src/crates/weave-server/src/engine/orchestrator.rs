//! Trigger entry point: create a run row and hand execution to a
//! detached background task.
//!
//! The task is tied to the run's lifetime, not to the HTTP request
//! that triggered it, and owns its own pool handle.

use serde_json::Value;
use tracing::info;

use crate::db::repositories::{RunRepository, WorkflowRepository};
use crate::engine::{executor, EngineError};
use crate::state::AppState;

/// Insert a pending run for the workflow and spawn its executor.
/// Returns the run id immediately.
pub async fn create_and_start_run(
    state: &AppState,
    workflow_id: i64,
    trigger_type: &str,
    trigger_payload: Value,
    user_id: Option<String>,
) -> Result<i64, EngineError> {
    let workflow = WorkflowRepository::get_by_id(&state.pool, workflow_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("workflow {workflow_id}")))?;

    let user_id = user_id.or_else(|| workflow.user_id.clone());
    let run = RunRepository::create(
        &state.pool,
        workflow_id,
        user_id.as_deref(),
        trigger_type,
        &trigger_payload.to_string(),
    )
    .await?;

    info!(run_id = run.id, workflow_id, trigger_type, "run created");

    let task_state = state.clone();
    let run_id = run.id;
    tokio::spawn(async move {
        executor::execute_run(task_state, run_id).await;
    });

    Ok(run_id)
}
