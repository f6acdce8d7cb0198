//! The run engine: per-run background execution and its wiring.

pub mod context;
pub mod executor;
pub mod orchestrator;

use thiserror::Error;

/// Failures surfacing beyond a node: infrastructure problems, not
/// block failures (those are handled inside the executor loop).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid graph: {0}")]
    Graph(#[from] weave_core::GraphError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}
