//! Run model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// One execution of a workflow. Mutated only by the owning executor
/// task until it reaches a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Run {
    pub id: i64,
    pub workflow_id: i64,
    pub user_id: Option<String>,
    /// pending | running | succeeded | failed. Terminal states stick.
    pub status: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub trigger_type: Option<String>,
    /// Trigger payload as JSON text.
    pub trigger_payload: String,
    /// node_id → output map as JSON text, set at completion.
    pub outputs: Option<String>,
}

impl Run {
    pub fn trigger_payload_value(&self) -> Value {
        serde_json::from_str(&self.trigger_payload).unwrap_or_else(|_| Value::Object(Default::default()))
    }

    pub fn outputs_value(&self) -> Option<Value> {
        self.outputs
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    pub fn is_terminal(&self) -> bool {
        self.status == "succeeded" || self.status == "failed"
    }
}
