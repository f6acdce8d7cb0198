//! Error types shared across the engine.

use thiserror::Error;

/// Rejection reasons for a workflow graph, raised at authoring or load
/// time. Surfaces as a 400 at the API boundary.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate node id: {0}")]
    DuplicateNodeId(String),

    #[error("edge {edge_id} references missing node(s): {from} -> {to}")]
    UnknownEndpoint {
        edge_id: String,
        from: String,
        to: String,
    },

    #[error("unknown block type '{block_type}' on node {node_id}")]
    UnknownBlockType { node_id: String, block_type: String },

    #[error("node {node_id}: invalid settings: {message}")]
    InvalidSettings { node_id: String, message: String },

    #[error("agent node {node_id}: {message}")]
    InvalidAgentTools { node_id: String, message: String },

    #[error("graph contains a cycle among control edges")]
    Cycle,
}

/// Typed failure raised by a block's `run`.
///
/// The executor persists the error on the node run, logs it and fails
/// the run; blocks signal the category so the surface can distinguish
/// configuration mistakes from upstream outages.
#[derive(Debug, Error)]
pub enum BlockError {
    /// Bad settings or a strict template failure.
    #[error("config error: {0}")]
    Config(String),

    /// A required capability or credential is absent.
    #[error("dependency error: {0}")]
    Dependency(String),

    /// An upstream API call failed.
    #[error("remote error: {0}")]
    Remote(String),

    /// An external deadline expired.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Engine bug or unclassified failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BlockError {
    /// Short kind tag persisted alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Dependency(_) => "dependency",
            Self::Remote(_) => "remote",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<TemplateError> for BlockError {
    fn from(err: TemplateError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for BlockError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Failure while rendering a `{{ … }}` expression in strict mode.
#[derive(Debug, Error)]
#[error("template error: {0}")]
pub struct TemplateError(pub String);
