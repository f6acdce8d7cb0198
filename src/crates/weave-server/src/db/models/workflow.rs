//! Workflow model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use weave_core::Graph;

/// A persisted workflow. The graph is stored as JSON text and parsed
/// on demand; runs snapshot it at execution start.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Workflow {
    pub id: i64,
    pub user_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub webhook_slug: Option<String>,
    /// Graph document as JSON text.
    pub graph: String,
    pub created_at: String,
}

impl Workflow {
    /// Parse the stored graph document.
    pub fn graph(&self) -> Result<Graph, serde_json::Error> {
        serde_json::from_str(&self.graph)
    }

    pub fn graph_value(&self) -> serde_json::Value {
        serde_json::from_str(&self.graph).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_round_trips_through_text() {
        let workflow = Workflow {
            id: 1,
            user_id: None,
            name: "wf".to_string(),
            description: None,
            webhook_slug: None,
            graph: r#"{"nodes":[{"id":"s","type":"start","settings":{}}],"edges":[]}"#.to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let graph = workflow.graph().unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].node_type, "start");
    }
}
