//! Pure and utility transforms.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use weave_core::template::{block_context, render_str, RenderMode};
use weave_core::{Block, BlockError, BlockInput, RunContext};

/// `transform.template` — render a template string against upstream
/// outputs and explicit `values`.
pub struct TemplateBlock;

#[derive(Debug, Deserialize)]
struct TemplateSettings {
    template: String,
    #[serde(default)]
    values: serde_json::Map<String, Value>,
}

#[async_trait]
impl Block for TemplateBlock {
    fn type_name(&self) -> &'static str {
        "transform.template"
    }

    fn summary(&self) -> &'static str {
        "Render a template by substituting {{ }} expressions against context"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "template": {"type": "string", "description": "Template string with {{ }} placeholders"},
                "values": {"type": "object", "description": "Extra values exposed to the template"}
            },
            "required": ["template"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }))
    }

    async fn run(&self, input: &BlockInput, _ctx: &RunContext) -> Result<Value, BlockError> {
        let settings: TemplateSettings = input.settings_as()?;

        let mut context = block_context(input);
        if let Value::Object(map) = &mut context {
            // Explicit values fill gaps; node ids and the reserved
            // keys keep precedence.
            for (k, v) in settings.values {
                map.entry(k).or_insert(v);
            }
        }

        let text = render_str(&settings.template, &context, RenderMode::Strict)?;
        Ok(json!({ "text": text }))
    }
}

/// `transform.uppercase` — uppercase a rendered text setting.
pub struct UppercaseBlock;

#[derive(Debug, Deserialize)]
struct UppercaseSettings {
    text: String,
    #[serde(default)]
    trim_whitespace: bool,
}

#[async_trait]
impl Block for UppercaseBlock {
    fn type_name(&self) -> &'static str {
        "transform.uppercase"
    }

    fn summary(&self) -> &'static str {
        "Convert a text string to uppercase"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Text to transform to uppercase"},
                "trim_whitespace": {"type": "boolean", "default": false}
            },
            "required": ["text"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }))
    }

    async fn run(&self, input: &BlockInput, _ctx: &RunContext) -> Result<Value, BlockError> {
        let settings: UppercaseSettings = input.settings_as()?;
        let context = block_context(input);
        let mut value = render_str(&settings.text, &context, RenderMode::Strict)?;
        if settings.trim_whitespace {
            value = value.trim().to_string();
        }
        Ok(json!({ "text": value.to_uppercase() }))
    }
}

/// `json.get` — extract a nested value from JSON by path.
pub struct JsonGetBlock;

#[derive(Debug, Deserialize)]
struct JsonGetSettings {
    path: Vec<Value>,
    #[serde(default)]
    source: Option<Value>,
}

#[async_trait]
impl Block for JsonGetBlock {
    fn type_name(&self) -> &'static str {
        "json.get"
    }

    fn summary(&self) -> &'static str {
        "Extract a nested value from JSON by path"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "array",
                    "items": {"type": ["string", "integer"]},
                    "description": "Path keys to traverse into"
                },
                "source": {
                    "type": ["object", "null"],
                    "description": "Optional source JSON; defaults to the first upstream value"
                }
            },
            "required": ["path"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"value": {}},
            "required": ["value"]
        }))
    }

    async fn run(&self, input: &BlockInput, _ctx: &RunContext) -> Result<Value, BlockError> {
        let settings: JsonGetSettings = input.settings_as()?;
        let source = settings
            .source
            .filter(|s| !s.is_null())
            .or_else(|| input.first_upstream().cloned())
            .unwrap_or_else(|| json!({}));

        let mut current = source;
        for key in &settings.path {
            let next = match (&current, key) {
                (Value::Object(map), Value::String(k)) => map.get(k).cloned(),
                (Value::Array(items), Value::Number(n)) => n
                    .as_u64()
                    .and_then(|idx| items.get(idx as usize).cloned()),
                _ => None,
            };
            match next {
                Some(value) => current = value,
                None => return Ok(json!({ "value": Value::Null })),
            }
        }
        Ok(json!({ "value": current }))
    }
}

/// `math.add` — add two numbers.
pub struct MathAddBlock;

#[derive(Debug, Deserialize)]
struct MathAddSettings {
    a: f64,
    b: f64,
}

#[async_trait]
impl Block for MathAddBlock {
    fn type_name(&self) -> &'static str {
        "math.add"
    }

    fn summary(&self) -> &'static str {
        "Add two numbers"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "number", "description": "First addend"},
                "b": {"type": "number", "description": "Second addend"}
            },
            "required": ["a", "b"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"result": {"type": "number"}},
            "required": ["result"]
        }))
    }

    async fn run(&self, input: &BlockInput, _ctx: &RunContext) -> Result<Value, BlockError> {
        let settings: MathAddSettings = input.settings_as()?;
        Ok(json!({ "result": settings.a + settings.b }))
    }
}

/// `util.sleep` — asynchronously sleep for N seconds.
pub struct SleepBlock;

#[derive(Debug, Deserialize)]
struct SleepSettings {
    #[serde(default = "default_seconds")]
    seconds: f64,
    #[serde(default)]
    jitter_ms: u64,
}

fn default_seconds() -> f64 {
    0.1
}

#[async_trait]
impl Block for SleepBlock {
    fn type_name(&self) -> &'static str {
        "util.sleep"
    }

    fn summary(&self) -> &'static str {
        "Asynchronously sleep for N seconds"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "seconds": {"type": "number", "minimum": 0, "default": 0.1},
                "jitter_ms": {"type": "integer", "minimum": 0, "default": 0}
            }
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"slept": {"type": "number"}},
            "required": ["slept"]
        }))
    }

    async fn run(&self, input: &BlockInput, _ctx: &RunContext) -> Result<Value, BlockError> {
        let settings: SleepSettings = input.settings_as()?;
        let total = settings.seconds.max(0.0) + settings.jitter_ms as f64 / 1000.0;
        tokio::time::sleep(std::time::Duration::from_secs_f64(total)).await;
        Ok(json!({ "slept": total }))
    }
}

/// `control.branch` — evaluate an expression against context and emit
/// a boolean. The executor has no branching primitive; downstream
/// nodes gate on `{{ node.condition }}` via templating.
pub struct BranchBlock;

#[async_trait]
impl Block for BranchBlock {
    fn type_name(&self) -> &'static str {
        "control.branch"
    }

    fn summary(&self) -> &'static str {
        "Evaluate an expression against context and output a boolean; downstream routing is expressed through templates"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {"type": "string", "description": "Expression resolved against upstream/settings/trigger context"}
            },
            "required": ["expression"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"condition": {"type": "boolean"}},
            "required": ["condition"]
        }))
    }

    async fn run(&self, input: &BlockInput, _ctx: &RunContext) -> Result<Value, BlockError> {
        let expression = input
            .settings
            .get("expression")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BlockError::Config("control.branch requires 'expression'".to_string()))?;

        let context = block_context(input);
        let rendered = render_str(expression, &context, RenderMode::Strict)?;
        let trimmed = rendered.trim();
        let condition = !trimmed.is_empty() && trimmed != "false" && trimmed != "0";
        Ok(json!({ "condition": condition }))
    }
}
