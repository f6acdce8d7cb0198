//! The block contract: a typed unit of computation with declared
//! settings/output schemas and an async `run`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::RunContext;
use crate::error::BlockError;

/// Whether a block is a plain executor or an agent that drives tool
/// sub-executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Executor,
    Agent,
}

/// A tool binding handed to an agent node, either declared in its
/// settings or derived from an outbound `tool` edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tool_type: String,
    #[serde(default)]
    pub settings: Value,
}

/// The input envelope passed to a block's `run`.
///
/// `upstream` maps each control-edge parent id to that node's output,
/// in parent insertion order. Agents additionally receive the tool
/// nodes attached via `tool` edges in `derived_tools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInput {
    #[serde(default)]
    pub settings: Value,

    #[serde(default)]
    pub upstream: Map<String, Value>,

    #[serde(default)]
    pub trigger: Value,

    pub node_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(
        rename = "__derived_tools_from_edges__",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub derived_tools: Vec<ToolSpec>,
}

impl BlockInput {
    pub fn new(node_id: impl Into<String>, settings: Value) -> Self {
        Self {
            settings,
            upstream: Map::new(),
            trigger: Value::Object(Map::new()),
            node_id: node_id.into(),
            user_id: None,
            derived_tools: Vec::new(),
        }
    }

    /// First upstream output, if any. Upstream order follows the
    /// parent edge order, so this is deterministic.
    pub fn first_upstream(&self) -> Option<&Value> {
        self.upstream.values().next()
    }

    /// Deserialize the settings object into a typed record.
    pub fn settings_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, BlockError> {
        serde_json::from_value(self.settings.clone())
            .map_err(|e| BlockError::Config(format!("invalid settings: {e}")))
    }
}

/// A typed unit of computation.
///
/// Implementations declare their identity and schemas statically and do
/// the work in `run`. `run` must return a plain data object matching
/// the declared output shape when one is declared, and signals failure
/// by returning a [`BlockError`].
#[async_trait]
pub trait Block: Send + Sync {
    /// Registry key, e.g. `transform.uppercase`.
    fn type_name(&self) -> &'static str;

    fn kind(&self) -> BlockKind {
        BlockKind::Executor
    }

    /// One-line description for the registry catalog.
    fn summary(&self) -> &'static str;

    /// JSON Schema for the settings object.
    fn settings_schema(&self) -> Value;

    /// JSON Schema for the output object, when the shape is declared.
    fn output_schema(&self) -> Option<Value> {
        None
    }

    /// Whether an agent may invoke this block as a tool.
    fn tool_compatible(&self) -> bool {
        false
    }

    /// Editor hints and connector declarations, if any.
    fn extras(&self) -> Option<Value> {
        None
    }

    async fn run(&self, input: &BlockInput, ctx: &RunContext) -> Result<Value, BlockError>;
}
