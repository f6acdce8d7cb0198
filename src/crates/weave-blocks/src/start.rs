//! Graph entry and terminal sink blocks.

use async_trait::async_trait;
use serde_json::{json, Value};

use weave_core::template::{block_context, render_str, value_to_string, RenderMode};
use weave_core::{Block, BlockError, BlockInput, RunContext};

/// `start` — returns `settings.payload` when present, else the run's
/// trigger payload. The output is the payload object itself so
/// downstream nodes reference `{{ start.x }}` directly.
pub struct StartBlock;

#[async_trait]
impl Block for StartBlock {
    fn type_name(&self) -> &'static str {
        "start"
    }

    fn summary(&self) -> &'static str {
        "Start node returns provided payload or trigger payload (as raw object)"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "payload": {
                    "type": "object",
                    "description": "Explicit payload to emit; if not set, uses trigger payload"
                }
            }
        })
    }

    async fn run(&self, input: &BlockInput, _ctx: &RunContext) -> Result<Value, BlockError> {
        let payload = match input.settings.get("payload") {
            Some(payload) if !payload.is_null() => payload.clone(),
            _ => input.trigger.clone(),
        };
        // Always emit an object so downstream templating has keys.
        if payload.is_object() {
            Ok(payload)
        } else {
            Ok(json!({ "value": payload }))
        }
    }
}

/// `show` — terminal sink. Renders an optional template against the
/// upstream context (lenient: previews are best-effort) and logs an
/// inline preview for observers.
pub struct ShowBlock;

#[async_trait]
impl Block for ShowBlock {
    fn type_name(&self) -> &'static str {
        "show"
    }

    fn summary(&self) -> &'static str {
        "Display input data in the UI; terminal sink block"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": {"type": ["string", "null"], "description": "Optional title to display in UI"},
                "template": {"type": ["string", "null"], "description": "Optional preview template rendered against upstream"}
            }
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"data": {"type": "object"}},
            "required": ["data"]
        }))
    }

    async fn run(&self, input: &BlockInput, ctx: &RunContext) -> Result<Value, BlockError> {
        let title = input.settings.get("title").and_then(Value::as_str);
        let template = input.settings.get("template").and_then(Value::as_str);

        let context = block_context(input);
        let rendered = match template {
            Some(template) => Some(render_str(template, &context, RenderMode::Lenient)?),
            None => None,
        };

        let upstream_keys: Vec<&String> = input.upstream.keys().take(20).collect();
        let preview = input.first_upstream().map(|first| {
            let text = match first.get("text") {
                Some(text) => value_to_string(text),
                None => value_to_string(first),
            };
            text.chars().take(120).collect::<String>()
        });

        let mut message = format!("show: title={title:?} upstream_keys={upstream_keys:?}");
        if let Some(preview) = &preview {
            message.push_str(&format!(" preview={preview:?}"));
        }

        let payload = json!({
            "upstream": Value::Object(input.upstream.clone()),
            "settings": input.settings.clone(),
            "template": template,
            "rendered": rendered,
        });

        ctx.log(
            &message,
            Some(json!({
                "preview": {"title": title, "upstream_keys": upstream_keys, "preview": preview},
                "full": payload,
            })),
            Some(&input.node_id),
        )
        .await;

        Ok(json!({ "data": payload }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn start_prefers_settings_payload() {
        let mut input = BlockInput::new("s", json!({"payload": {"hello": "world"}}));
        input.trigger = json!({"ignored": true});
        let out = StartBlock.run(&input, &testing::ctx()).await.unwrap();
        assert_eq!(out, json!({"hello": "world"}));
    }

    #[tokio::test]
    async fn start_falls_back_to_trigger() {
        let mut input = BlockInput::new("s", json!({}));
        input.trigger = json!({"q": 1});
        let out = StartBlock.run(&input, &testing::ctx()).await.unwrap();
        assert_eq!(out, json!({"q": 1}));
    }

    #[tokio::test]
    async fn start_null_payload_falls_back_to_trigger() {
        let input = BlockInput::new("s", json!({"payload": null}));
        let out = StartBlock.run(&input, &testing::ctx()).await.unwrap();
        assert_eq!(out, json!({}));
    }

    #[tokio::test]
    async fn start_wraps_scalar_trigger() {
        let mut input = BlockInput::new("s", json!({}));
        input.trigger = json!("plain text");
        let out = StartBlock.run(&input, &testing::ctx()).await.unwrap();
        assert_eq!(out, json!({"value": "plain text"}));
    }

    #[tokio::test]
    async fn show_renders_template_and_wraps_data() {
        let mut input = BlockInput::new("sink", json!({"template": "got {{ up.text }}"}));
        input
            .upstream
            .insert("up".to_string(), json!({"text": "payload"}));
        let out = ShowBlock.run(&input, &testing::ctx()).await.unwrap();
        assert_eq!(out["data"]["rendered"], "got payload");
        assert_eq!(out["data"]["upstream"]["up"]["text"], "payload");
    }
}
