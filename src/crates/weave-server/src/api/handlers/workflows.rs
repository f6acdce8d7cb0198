//! Workflow CRUD and graph validation.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use weave_core::Graph;

use crate::api::current_user;
use crate::api::error::{ApiError, ApiResult};
use crate::db::repositories::WorkflowRepository;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateWorkflowRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub webhook_slug: Option<String>,
    pub graph: Graph,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWorkflowRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub webhook_slug: Option<String>,
    #[serde(default)]
    pub graph: Option<Graph>,
}

#[derive(Debug, Deserialize)]
pub struct ValidateGraphRequest {
    pub graph: Graph,
}

/// POST /workflows
pub async fn create_workflow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateWorkflowRequest>,
) -> ApiResult<Json<Value>> {
    req.graph
        .validate(&state.registry)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let user = current_user(&headers);
    let graph_text = serde_json::to_string(&req.graph)?;

    let workflow = WorkflowRepository::create(
        &state.pool,
        user.as_deref(),
        &req.name,
        req.description.as_deref(),
        req.webhook_slug.as_deref(),
        &graph_text,
    )
    .await?;

    tracing::info!(workflow_id = workflow.id, "workflow created");
    Ok(Json(json!({ "id": workflow.id })))
}

/// GET /workflows
pub async fn list_workflows(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    let user = current_user(&headers);
    let workflows = WorkflowRepository::list_visible(&state.pool, user.as_deref()).await?;
    let items: Vec<Value> = workflows
        .iter()
        .map(|w| {
            json!({
                "id": w.id,
                "name": w.name,
                "description": w.description,
                "webhook_slug": w.webhook_slug,
                "created_at": w.created_at,
            })
        })
        .collect();
    Ok(Json(Value::Array(items)))
}

/// GET /workflows/:id
pub async fn get_workflow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let user = current_user(&headers);
    let workflow = WorkflowRepository::get_visible(&state.pool, id, user.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Workflow not found".to_string()))?;
    Ok(Json(json!({
        "id": workflow.id,
        "name": workflow.name,
        "description": workflow.description,
        "webhook_slug": workflow.webhook_slug,
        "graph": workflow.graph_value(),
        "created_at": workflow.created_at,
    })))
}

/// PUT /workflows/:id
pub async fn update_workflow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<UpdateWorkflowRequest>,
) -> ApiResult<Json<Value>> {
    let user = current_user(&headers);
    let existing = WorkflowRepository::get_visible(&state.pool, id, user.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Workflow not found".to_string()))?;

    let mut updated = false;
    if let Some(name) = &req.name {
        WorkflowRepository::update_name(&state.pool, existing.id, name).await?;
        updated = true;
    }
    if let Some(description) = &req.description {
        WorkflowRepository::update_description(&state.pool, existing.id, description).await?;
        updated = true;
    }
    if let Some(webhook_slug) = &req.webhook_slug {
        WorkflowRepository::update_webhook_slug(&state.pool, existing.id, webhook_slug).await?;
        updated = true;
    }
    if let Some(graph) = &req.graph {
        graph
            .validate(&state.registry)
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        WorkflowRepository::update_graph(&state.pool, existing.id, &serde_json::to_string(graph)?)
            .await?;
        updated = true;
    }

    Ok(Json(json!({ "updated": updated })))
}

/// DELETE /workflows/:id
pub async fn delete_workflow(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let user = current_user(&headers);
    let existing = WorkflowRepository::get_visible(&state.pool, id, user.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Workflow not found".to_string()))?;
    WorkflowRepository::delete(&state.pool, existing.id).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// POST /validate-graph
pub async fn validate_graph(
    State(state): State<AppState>,
    Json(req): Json<ValidateGraphRequest>,
) -> ApiResult<Json<Value>> {
    req.graph
        .validate(&state.registry)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(Json(json!({ "valid": true })))
}
