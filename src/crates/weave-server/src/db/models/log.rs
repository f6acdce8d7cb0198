//! Append-only run log entry.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;

/// One log line, immutable once written. Ids are monotonic within the
/// table, which is what the `after_id` cursor relies on.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub run_id: i64,
    pub user_id: Option<String>,
    pub node_id: Option<String>,
    pub ts: String,
    pub level: String,
    pub message: String,
    pub data: Option<String>,
}

impl LogEntry {
    pub fn data_value(&self) -> Option<Value> {
        self.data.as_deref().and_then(|raw| serde_json::from_str(raw).ok())
    }

    /// Wire shape used by the log endpoints and the SSE stream.
    pub fn to_wire(&self) -> Value {
        json!({
            "id": self.id,
            "run_id": self.run_id,
            "node_id": self.node_id,
            "ts": self.ts,
            "level": self.level,
            "message": self.message,
            "data": self.data_value(),
        })
    }
}
