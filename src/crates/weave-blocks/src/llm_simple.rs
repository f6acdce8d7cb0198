//! Single-completion LLM block.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use weave_core::llm::{ChatMessage, ChatRequest};
use weave_core::template::{block_context, render_str, RenderMode};
use weave_core::{Block, BlockError, BlockInput, RunContext};

/// `llm.simple` — one prompt in, one completion out. Without a
/// configured provider the block degrades to an upper-case echo, which
/// keeps offline runs deterministic.
pub struct LlmSimpleBlock;

#[derive(Debug, Deserialize)]
struct LlmSimpleSettings {
    prompt: String,
    #[serde(default = "default_model")]
    model: String,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[async_trait]
impl Block for LlmSimpleBlock {
    fn type_name(&self) -> &'static str {
        "llm.simple"
    }

    fn summary(&self) -> &'static str {
        "Generate text with the configured LLM; falls back to uppercase echo when no API key"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {"type": "string", "description": "Prompt text (supports {{ }} substitutions)"},
                "model": {"type": "string", "default": "gpt-4o-mini"}
            },
            "required": ["prompt"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        }))
    }

    async fn run(&self, input: &BlockInput, ctx: &RunContext) -> Result<Value, BlockError> {
        let settings: LlmSimpleSettings = input.settings_as()?;
        if settings.prompt.is_empty() {
            return Err(BlockError::Config("llm.simple requires 'prompt'".to_string()));
        }

        let context = block_context(input);
        let prompt = render_str(&settings.prompt, &context, RenderMode::Strict)?;

        ctx.log(
            &format!("llm.simple: sending [{}]", settings.model),
            Some(json!({
                "model": settings.model,
                "prompt_preview": prompt.chars().take(500).collect::<String>(),
            })),
            Some(&input.node_id),
        )
        .await;

        if !ctx.llm_enabled {
            let text = prompt.to_uppercase();
            ctx.log(
                &format!("llm.simple: fallback [{}]", settings.model),
                Some(json!({
                    "reason": "no_api_key",
                    "text_preview": text.chars().take(500).collect::<String>(),
                })),
                Some(&input.node_id),
            )
            .await;
            return Ok(json!({ "text": text }));
        }

        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_model(settings.model.clone())
            .with_temperature(1.0);
        let response = ctx
            .chat
            .chat(request)
            .await
            .map_err(|e| BlockError::Remote(format!("llm.simple: {e}")))?;

        ctx.log(
            &format!("llm.simple: received [{}]", settings.model),
            Some(json!({
                "model": settings.model,
                "text_preview": response.text.chars().take(1000).collect::<String>(),
            })),
            Some(&input.node_id),
        )
        .await;

        Ok(json!({ "text": response.text }))
    }
}
