//! Per-node execution record.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// One node execution within a run: created when the node starts,
/// mutated once at completion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NodeRun {
    pub id: i64,
    pub run_id: i64,
    pub node_id: String,
    pub node_type: String,
    /// pending | running | succeeded | failed | skipped.
    pub status: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl NodeRun {
    pub fn input_value(&self) -> Option<Value> {
        self.input.as_deref().and_then(|raw| serde_json::from_str(raw).ok())
    }

    pub fn output_value(&self) -> Option<Value> {
        self.output.as_deref().and_then(|raw| serde_json::from_str(raw).ok())
    }

    pub fn error_value(&self) -> Option<Value> {
        self.error.as_deref().and_then(|raw| serde_json::from_str(raw).ok())
    }
}
