//! Registry catalog endpoints.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /blocks — registered type names.
pub async fn get_blocks(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "blocks": state.registry.types() }))
}

/// GET /block-specs — full catalog with schemas.
pub async fn get_block_specs(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "blocks": state.registry.specs() }))
}
