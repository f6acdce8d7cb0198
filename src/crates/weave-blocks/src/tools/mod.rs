//! Tool-compatible blocks.
//!
//! Tool nodes are attached to agents via `tool` edges and invoked from
//! the agent's reasoning loop. When the engine's main pass encounters
//! one it is skipped; executing a shim directly is a no-op. The
//! calculator is the exception — it does real work either way.

use async_trait::async_trait;
use serde_json::{json, Value};

use weave_core::{Block, BlockError, BlockInput, RunContext};

pub mod calculator;
pub mod composio;

fn shim_settings_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": ["string", "null"], "description": "Optional tool name override"}
        }
    })
}

fn shim_output_schema() -> Option<Value> {
    Some(json!({
        "type": "object",
        "properties": {"ok": {"type": "boolean"}},
        "required": ["ok"]
    }))
}

fn tool_extras() -> Option<Value> {
    Some(json!({"toolCompatible": true}))
}

/// `tool.http_request` — HTTP tool binding for agents. The agent loop
/// dispatches invocations to the `http.request` implementation.
pub struct HttpRequestToolBlock;

#[async_trait]
impl Block for HttpRequestToolBlock {
    fn type_name(&self) -> &'static str {
        "tool.http_request"
    }

    fn summary(&self) -> &'static str {
        "HTTP request tool for agents"
    }

    fn settings_schema(&self) -> Value {
        shim_settings_schema()
    }

    fn output_schema(&self) -> Option<Value> {
        shim_output_schema()
    }

    fn tool_compatible(&self) -> bool {
        true
    }

    fn extras(&self) -> Option<Value> {
        tool_extras()
    }

    async fn run(&self, _input: &BlockInput, _ctx: &RunContext) -> Result<Value, BlockError> {
        // Tool nodes are invoked by the agent, not the engine.
        Ok(json!({ "ok": true }))
    }
}

/// `tool.websearch` — hosted web-search tool binding.
pub struct WebSearchToolBlock;

#[async_trait]
impl Block for WebSearchToolBlock {
    fn type_name(&self) -> &'static str {
        "tool.websearch"
    }

    fn summary(&self) -> &'static str {
        "Web search tool (hosted provider runtime)"
    }

    fn settings_schema(&self) -> Value {
        shim_settings_schema()
    }

    fn output_schema(&self) -> Option<Value> {
        shim_output_schema()
    }

    fn tool_compatible(&self) -> bool {
        true
    }

    fn extras(&self) -> Option<Value> {
        tool_extras()
    }

    async fn run(&self, _input: &BlockInput, _ctx: &RunContext) -> Result<Value, BlockError> {
        Ok(json!({ "ok": true }))
    }
}

/// `tool.code_interpreter` — hosted code-interpreter tool binding.
pub struct CodeInterpreterToolBlock;

#[async_trait]
impl Block for CodeInterpreterToolBlock {
    fn type_name(&self) -> &'static str {
        "tool.code_interpreter"
    }

    fn summary(&self) -> &'static str {
        "Code interpreter tool (hosted provider runtime)"
    }

    fn settings_schema(&self) -> Value {
        shim_settings_schema()
    }

    fn output_schema(&self) -> Option<Value> {
        shim_output_schema()
    }

    fn tool_compatible(&self) -> bool {
        true
    }

    fn extras(&self) -> Option<Value> {
        tool_extras()
    }

    async fn run(&self, _input: &BlockInput, _ctx: &RunContext) -> Result<Value, BlockError> {
        Ok(json!({ "ok": true }))
    }
}
