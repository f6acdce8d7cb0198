//! Integration account endpoints.
//!
//! The OAuth dance with the provider happens outside this server; the
//! surface here records and lists the resulting connected accounts.

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::current_user;
use crate::api::error::{ApiError, ApiResult};
use crate::db::repositories::IntegrationAccountRepository;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    #[serde(default)]
    pub toolkit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub toolkit: String,
    pub connected_account_id: String,
}

/// GET /integrations/accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListAccountsQuery>,
) -> ApiResult<Json<Value>> {
    let Some(user) = current_user(&headers) else {
        return Ok(Json(Value::Array(Vec::new())));
    };
    let accounts = IntegrationAccountRepository::list_for_user(
        &state.pool,
        &user,
        query.toolkit.as_deref(),
    )
    .await?;
    let items: Vec<Value> = accounts
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "toolkit": a.toolkit,
                "connected_account_id": a.connected_account_id,
                "status": a.status,
                "created_at": a.created_at,
            })
        })
        .collect();
    Ok(Json(Value::Array(items)))
}

/// POST /integrations/accounts
pub async fn create_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateAccountRequest>,
) -> ApiResult<Json<Value>> {
    let user = current_user(&headers)
        .ok_or_else(|| ApiError::Unauthorized("x-user-id header required".to_string()))?;
    let account = IntegrationAccountRepository::create(
        &state.pool,
        &user,
        &req.toolkit,
        &req.connected_account_id,
    )
    .await?;
    Ok(Json(json!({
        "id": account.id,
        "toolkit": account.toolkit,
        "connected_account_id": account.connected_account_id,
        "status": account.status,
    })))
}
