//! `agent.react` — a reasoning loop that can call attached tools.
//!
//! The agent receives tool bindings two ways: declared in
//! `settings.tools` and derived from outbound `tool` edges (merged at
//! execution, first name wins). The provider runtime is abstracted
//! behind [`AgentRuntime`]; the default implementation is an internal
//! ReAct loop speaking the
//! `Action / Action Input / Observation / Final Answer` protocol
//! against whatever [`ChatModel`](weave_core::llm::ChatModel) the run
//! context carries — including the deterministic offline model, which
//! keeps agent graphs executable without an API key.
//!
//! Tool sub-calls run through the block registry with a
//! `<agent>::tool::<name>` node id so log attribution stays readable.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use weave_core::llm::{ChatMessage, ChatRequest};
use weave_core::template::{block_context, render_str, RenderMode};
use weave_core::{Block, BlockError, BlockInput, BlockKind, RunContext, ToolSpec};

use crate::tools::composio::derive_toolkit_from_slug;

const DEFAULT_SYSTEM: &str = "You are a helpful assistant. Use tools when needed.";
const REACT_INSTRUCTIONS: &str = "You may use tools. When using a tool, respond EXACTLY in this format:\n\
Action: <tool_name>\n\
Action Input: <JSON or plain text>\n\
If you have the final answer, respond with:\n\
Final Answer: <text>\n";

#[derive(Debug, Deserialize)]
struct AgentReactSettings {
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    tools: Vec<ToolSpec>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default = "default_temperature")]
    temperature: f64,
    #[serde(default = "default_max_steps")]
    max_steps: u32,
    #[serde(default = "default_timeout")]
    timeout_seconds: f64,
}

fn default_temperature() -> f64 {
    1.0
}

fn default_max_steps() -> u32 {
    8
}

fn default_timeout() -> f64 {
    60.0
}

/// A tool the loop can actually dispatch: display name plus the block
/// type invocations are routed to.
#[derive(Debug, Clone)]
pub struct PreparedTool {
    pub name: String,
    pub dispatch_type: String,
    pub settings: Value,
}

/// Everything a runtime needs to drive one agent execution.
pub struct AgentParams<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    pub model: Option<&'a str>,
    pub temperature: f64,
    pub max_steps: u32,
    pub tools: &'a [PreparedTool],
    pub input: &'a BlockInput,
}

pub struct AgentOutcome {
    pub final_text: String,
    pub trace: Vec<Value>,
}

/// Provider seam: the internal ReAct loop is the default
/// implementation; a hosted agent runtime would slot in here.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn run(&self, params: AgentParams<'_>, ctx: &RunContext)
        -> Result<AgentOutcome, BlockError>;
}

/// The internal ReAct loop.
pub struct ReactLoopRuntime;

#[async_trait]
impl AgentRuntime for ReactLoopRuntime {
    async fn run(
        &self,
        params: AgentParams<'_>,
        ctx: &RunContext,
    ) -> Result<AgentOutcome, BlockError> {
        let final_re = Regex::new(r"(?is)Final Answer:\s*(.*)").expect("static regex");
        let action_re =
            Regex::new(r"(?is)Action:\s*([^\n]+)\n+\s*Action Input:\s*(.*)").expect("static regex");

        let inventory = if params.tools.is_empty() {
            "(no tools available)".to_string()
        } else {
            params
                .tools
                .iter()
                .map(|t| format!("- {}: call with JSON input.", t.name))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut convo = vec![ChatMessage::system(format!(
            "{}\nAvailable tools:\n{}\n{}",
            params.system, inventory, REACT_INSTRUCTIONS
        ))];
        convo.push(ChatMessage::user(params.prompt.to_string()));

        let mut trace: Vec<Value> = Vec::new();

        for step in 1..=params.max_steps {
            let mut request = ChatRequest::new(convo.clone()).with_temperature(params.temperature);
            if let Some(model) = params.model {
                request = request.with_model(model.to_string());
            }
            let reply = ctx
                .chat
                .chat(request)
                .await
                .map_err(|e| BlockError::Remote(format!("agent.react: {e}")))?;
            let message = reply.text;
            trace.push(json!({"step": step, "assistant": message}));
            ctx.log(
                &format!("agent.react: step {step}"),
                Some(json!({
                    "assistant_msg_preview": message.chars().take(1000).collect::<String>(),
                })),
                Some(&params.input.node_id),
            )
            .await;

            if let Some(captures) = final_re.captures(&message) {
                let final_text = captures[1].trim().to_string();
                return Ok(AgentOutcome {
                    final_text,
                    trace,
                });
            }

            convo.push(ChatMessage::assistant(message.clone()));

            if let Some(captures) = action_re.captures(&message) {
                let tool_name = captures[1].trim().to_string();
                let raw_input = captures[2].trim().to_string();

                let observation = match params.tools.iter().find(|t| t.name == tool_name) {
                    None => format!("Unknown tool {tool_name}"),
                    Some(tool) => {
                        match dispatch_tool(tool, &raw_input, params.input, ctx).await {
                            Ok(result) => {
                                serde_json::to_string(&result).unwrap_or_else(|_| result.to_string())
                            }
                            Err(e) => format!("Tool {tool_name} error: {e}"),
                        }
                    }
                };
                convo.push(ChatMessage::user(format!("Observation: {observation}")));
                continue;
            }

            convo.push(ChatMessage::user("Please provide Final Answer.".to_string()));
        }

        Ok(AgentOutcome {
            final_text: "Failed to reach a final answer within max_steps.".to_string(),
            trace,
        })
    }
}

/// Invoke a prepared tool through the registry, with merged settings
/// and a namespaced node id for log attribution.
async fn dispatch_tool(
    tool: &PreparedTool,
    raw_input: &str,
    agent_input: &BlockInput,
    ctx: &RunContext,
) -> Result<Value, BlockError> {
    let mut settings = match &tool.settings {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    match serde_json::from_str::<Value>(raw_input) {
        Ok(Value::Object(args)) => {
            for (k, v) in args {
                settings.insert(k, v);
            }
        }
        Ok(other) => {
            insert_inferred(&mut settings, tool, other);
        }
        Err(_) => {
            insert_inferred(&mut settings, tool, Value::String(raw_input.to_string()));
        }
    }

    let node_id = format!("{}::tool::{}", agent_input.node_id, tool.name);
    let envelope = BlockInput {
        settings: Value::Object(settings.clone()),
        upstream: agent_input.upstream.clone(),
        trigger: agent_input.trigger.clone(),
        node_id: node_id.clone(),
        user_id: agent_input.user_id.clone(),
        derived_tools: Vec::new(),
    };

    ctx.log(
        &format!(
            "agent.react: invoking tool {} ({})",
            tool.name, tool.dispatch_type
        ),
        Some(json!({"tool_name": tool.name, "settings": Value::Object(settings)})),
        Some(&agent_input.node_id),
    )
    .await;

    let result = ctx.registry.run(&tool.dispatch_type, &envelope, ctx).await?;

    ctx.log(
        &format!("agent.react: tool {} returned", tool.name),
        Some(json!({
            "result_preview": result.to_string().chars().take(200).collect::<String>(),
        })),
        Some(&agent_input.node_id),
    )
    .await;

    Ok(result)
}

/// Non-JSON action input gets keyed by convention: `expression` for
/// calculators, `input` otherwise.
fn insert_inferred(settings: &mut Map<String, Value>, tool: &PreparedTool, value: Value) {
    let key = if tool.dispatch_type.ends_with("calculator") || settings.contains_key("expression") {
        "expression"
    } else {
        "input"
    };
    let value = match value {
        Value::String(s) => Value::String(s),
        other => Value::String(other.to_string()),
    };
    settings.insert(key.to_string(), value);
}

/// `agent.react` block.
pub struct AgentReactBlock {
    runtime: std::sync::Arc<dyn AgentRuntime>,
}

impl AgentReactBlock {
    pub fn new() -> Self {
        Self {
            runtime: std::sync::Arc::new(ReactLoopRuntime),
        }
    }

    pub fn with_runtime(runtime: std::sync::Arc<dyn AgentRuntime>) -> Self {
        Self { runtime }
    }

    /// Merge declared and edge-derived tools (first name wins) and
    /// drop the ones this runtime cannot serve: hosted tools without a
    /// provider, integration tools without a connected account.
    async fn prepare_tools(
        &self,
        settings_tools: &[ToolSpec],
        input: &BlockInput,
        ctx: &RunContext,
    ) -> Vec<PreparedTool> {
        let mut merged: Vec<&ToolSpec> = Vec::new();
        for spec in settings_tools.iter().chain(input.derived_tools.iter()) {
            if merged.iter().any(|t| t.name == spec.name) {
                continue;
            }
            merged.push(spec);
        }

        let mut prepared = Vec::new();
        let mut missing_toolkits: Vec<String> = Vec::new();
        let mut skipped_hosted: Vec<String> = Vec::new();

        for spec in merged {
            match spec.tool_type.as_str() {
                "tool.websearch" | "tool.code_interpreter" => {
                    skipped_hosted.push(spec.name.clone());
                }
                "tool.composio" => {
                    if self.composio_is_usable(spec, input, ctx, &mut missing_toolkits).await {
                        prepared.push(PreparedTool {
                            name: spec.name.clone(),
                            dispatch_type: spec.tool_type.clone(),
                            settings: spec.settings.clone(),
                        });
                    }
                }
                "tool.http_request" => {
                    // Route to the working HTTP implementation; the
                    // shim itself is a no-op.
                    prepared.push(PreparedTool {
                        name: spec.name.clone(),
                        dispatch_type: "http.request".to_string(),
                        settings: spec.settings.clone(),
                    });
                }
                _ => {
                    prepared.push(PreparedTool {
                        name: spec.name.clone(),
                        dispatch_type: spec.tool_type.clone(),
                        settings: spec.settings.clone(),
                    });
                }
            }
        }

        if !skipped_hosted.is_empty() {
            ctx.log(
                "agent.react: skipping hosted tools without a provider runtime",
                Some(json!({"tools": skipped_hosted})),
                Some(&input.node_id),
            )
            .await;
        }
        if !missing_toolkits.is_empty() {
            ctx.warn(
                "agent.react: skipping tools with no connected account",
                Some(json!({"missing_toolkits": missing_toolkits})),
                Some(&input.node_id),
            )
            .await;
        }

        prepared
    }

    /// A Composio tool is usable keyless (echo path), with an explicit
    /// account, or when an active account resolves for its toolkit.
    async fn composio_is_usable(
        &self,
        spec: &ToolSpec,
        input: &BlockInput,
        ctx: &RunContext,
        missing_toolkits: &mut Vec<String>,
    ) -> bool {
        if ctx.composio_api_key.is_none() {
            return true;
        }
        if spec
            .settings
            .get("use_account")
            .and_then(Value::as_str)
            .is_some()
        {
            return true;
        }

        let toolkit = spec
            .settings
            .get("toolkit")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                spec.settings
                    .get("tool_slug")
                    .and_then(Value::as_str)
                    .and_then(derive_toolkit_from_slug)
            });
        let Some(toolkit) = toolkit else {
            missing_toolkits.push(format!("(unresolvable toolkit for {})", spec.name));
            return false;
        };

        let user_id = input
            .user_id
            .clone()
            .or_else(|| ctx.user_id.clone())
            .unwrap_or_else(|| "system-user".to_string());
        let resolved = match &ctx.accounts {
            Some(resolver) => resolver.resolve(&user_id, &toolkit).await.is_some(),
            None => false,
        };
        if !resolved {
            missing_toolkits.push(toolkit);
        }
        resolved
    }
}

impl Default for AgentReactBlock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Block for AgentReactBlock {
    fn type_name(&self) -> &'static str {
        "agent.react"
    }

    fn kind(&self) -> BlockKind {
        BlockKind::Agent
    }

    fn summary(&self) -> &'static str {
        "ReAct-style agent that loops until a final answer; supports tool calls"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "system": {"type": ["string", "null"]},
                "prompt": {"type": ["string", "null"], "description": "User prompt (supports {{ }} substitutions)"},
                "tools": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": {"type": "string"},
                            "type": {"type": "string"},
                            "settings": {"type": "object"}
                        },
                        "required": ["name", "type"]
                    }
                },
                "model": {"type": ["string", "null"]},
                "temperature": {"type": "number", "minimum": 0.0, "maximum": 2.0, "default": 1.0},
                "max_steps": {"type": "integer", "minimum": 1, "maximum": 32, "default": 8},
                "timeout_seconds": {"type": "number", "minimum": 1.0, "default": 60.0}
            }
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "final": {"type": "string"},
                "trace": {"type": "array"}
            },
            "required": ["final", "trace"]
        }))
    }

    fn extras(&self) -> Option<Value> {
        Some(json!({
            "connectors": [
                {
                    "name": "tools",
                    "display_name": "Tools",
                    "kind": "tool-connector",
                    "multiple": true,
                    "accepts": ["tool"],
                    "description": "Connect tool blocks to be available to the agent"
                }
            ]
        }))
    }

    async fn run(&self, input: &BlockInput, ctx: &RunContext) -> Result<Value, BlockError> {
        let settings: AgentReactSettings = input.settings_as()?;

        let context = block_context(input);
        let system_raw = settings
            .system
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM.to_string());
        let system = render_str(&system_raw, &context, RenderMode::Strict)?;

        let prompt_raw = settings
            .prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| BlockError::Config("agent.react requires 'prompt'".to_string()))?;
        let prompt = render_str(&prompt_raw, &context, RenderMode::Strict)?;

        let tools = self.prepare_tools(&settings.tools, input, ctx).await;

        ctx.log(
            &format!(
                "agent.react: starting [{}]",
                settings.model.as_deref().unwrap_or("default")
            ),
            Some(json!({
                "model": settings.model,
                "temperature": settings.temperature,
                "num_tools": tools.len(),
            })),
            Some(&input.node_id),
        )
        .await;

        let params = AgentParams {
            system: &system,
            prompt: &prompt,
            model: settings.model.as_deref(),
            temperature: settings.temperature,
            max_steps: settings.max_steps,
            tools: &tools,
            input,
        };

        let outcome = tokio::time::timeout(
            Duration::from_secs_f64(settings.timeout_seconds.max(1.0)),
            self.runtime.run(params, ctx),
        )
        .await
        .map_err(|_| {
            BlockError::Timeout(format!(
                "agent.react: no final answer within {} seconds",
                settings.timeout_seconds
            ))
        })??;

        Ok(json!({
            "final": outcome.final_text,
            "trace": outcome.trace,
        }))
    }
}
