//! Composio integration tool: execute a toolkit tool through a
//! connected account.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use weave_core::template::{block_context, render_value, RenderMode};
use weave_core::{Block, BlockError, BlockInput, RunContext};

const COMPOSIO_EXECUTE_BASE: &str = "https://backend.composio.dev/api/v3/tools/execute";

/// Toolkit for a tool slug is the prefix before the first underscore:
/// `SLACK_SEND_MESSAGE` → `SLACK`.
pub fn derive_toolkit_from_slug(tool_slug: &str) -> Option<String> {
    let prefix = tool_slug.split('_').next()?;
    if prefix.is_empty() {
        return None;
    }
    Some(prefix.to_uppercase())
}

/// `tool.composio` — execute a Composio tool using a connected
/// account. Without an API key the block degrades to a deterministic
/// echo result so graphs stay runnable offline.
pub struct ComposioToolBlock;

#[derive(Debug, Deserialize)]
struct ComposioSettings {
    toolkit: String,
    tool_slug: String,
    #[serde(default)]
    use_account: Option<String>,
    #[serde(default)]
    args: Value,
    #[serde(default = "default_timeout")]
    timeout_seconds: f64,
}

fn default_timeout() -> f64 {
    60.0
}

#[async_trait]
impl Block for ComposioToolBlock {
    fn type_name(&self) -> &'static str {
        "tool.composio"
    }

    fn summary(&self) -> &'static str {
        "Execute a Composio tool using a connected account"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "toolkit": {"type": "string", "description": "Toolkit name, e.g. GMAIL"},
                "tool_slug": {"type": "string", "description": "Tool slug, e.g. GMAIL_SEND_EMAIL"},
                "use_account": {"type": ["string", "null"], "description": "Specific connected_account_id; defaults to the most recent active account"},
                "args": {"type": "object", "description": "Arguments for the tool (templated)"},
                "timeout_seconds": {"type": "number", "minimum": 1, "default": 60.0}
            },
            "required": ["toolkit", "tool_slug"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "provider": {"type": "string"},
                "account_id": {"type": "string"},
                "result": {}
            },
            "required": ["provider", "result"]
        }))
    }

    fn tool_compatible(&self) -> bool {
        true
    }

    fn extras(&self) -> Option<Value> {
        Some(json!({"toolCompatible": true}))
    }

    async fn run(&self, input: &BlockInput, ctx: &RunContext) -> Result<Value, BlockError> {
        let settings: ComposioSettings = input.settings_as()?;

        let context = block_context(input);
        let args = render_value(&settings.args, &context, RenderMode::Strict)?;

        ctx.log(
            &format!(
                "tool.composio: executing {} on {}",
                settings.tool_slug, settings.toolkit
            ),
            Some(json!({
                "toolkit": settings.toolkit,
                "tool_slug": settings.tool_slug,
                "use_account": settings.use_account,
                "timeout_seconds": settings.timeout_seconds,
            })),
            Some(&input.node_id),
        )
        .await;

        let Some(api_key) = ctx.composio_api_key.clone() else {
            // Keyless echo keeps offline graphs runnable; mirrors the
            // stubbed execution path.
            ctx.warn(
                &format!(
                    "tool.composio: COMPOSIO_API_KEY not configured; echoing {}",
                    settings.tool_slug
                ),
                None,
                Some(&input.node_id),
            )
            .await;
            return Ok(json!({
                "provider": settings.toolkit,
                "account_id": settings.use_account.unwrap_or_default(),
                "result": {"ok": true, "echo": {"tool_slug": settings.tool_slug, "args": args}},
            }));
        };

        let user_id = input
            .user_id
            .clone()
            .or_else(|| ctx.user_id.clone())
            .unwrap_or_else(|| "system-user".to_string());

        let account_id = match settings.use_account.clone() {
            Some(id) => id,
            None => {
                let resolver = ctx.accounts.clone().ok_or_else(|| {
                    BlockError::Dependency(
                        "integration account lookup is not available".to_string(),
                    )
                })?;
                resolver
                    .resolve(&user_id, &settings.toolkit)
                    .await
                    .ok_or_else(|| {
                        BlockError::Dependency(format!(
                            "No connected account found for toolkit {}. Authorize via Integrations.",
                            settings.toolkit
                        ))
                    })?
            }
        };

        let url = format!("{COMPOSIO_EXECUTE_BASE}/{}", settings.tool_slug);
        let response = ctx
            .http
            .post(&url)
            .header("x-api-key", api_key)
            .json(&json!({
                "user_id": user_id,
                "connected_account_id": account_id,
                "arguments": args,
                "timeout": settings.timeout_seconds,
            }))
            .timeout(std::time::Duration::from_secs_f64(settings.timeout_seconds))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BlockError::Timeout(format!("tool.composio: {} timed out", settings.tool_slug))
                } else {
                    BlockError::Remote(format!("Composio execute error: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BlockError::Remote(format!(
                "Composio execute error: {status}: {body}"
            )));
        }
        let result: Value = response
            .json()
            .await
            .map_err(|e| BlockError::Remote(format!("Composio execute error: {e}")))?;

        ctx.log(
            &format!("tool.composio: executed {}", settings.tool_slug),
            Some(json!({"account_id": account_id})),
            Some(&input.node_id),
        )
        .await;

        Ok(json!({
            "provider": settings.toolkit,
            "account_id": account_id,
            "result": result,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn toolkit_derivation() {
        assert_eq!(
            derive_toolkit_from_slug("SLACK_SEND_MESSAGE").as_deref(),
            Some("SLACK")
        );
        assert_eq!(derive_toolkit_from_slug("GMAIL").as_deref(), Some("GMAIL"));
        assert_eq!(derive_toolkit_from_slug(""), None);
    }

    #[tokio::test]
    async fn keyless_execution_echoes_deterministically() {
        let mut input = BlockInput::new(
            "c",
            json!({
                "toolkit": "GMAIL",
                "tool_slug": "GMAIL_SEND_EMAIL",
                "args": {"to": "{{ s.email }}"}
            }),
        );
        input
            .upstream
            .insert("s".to_string(), json!({"email": "a@b.c"}));

        let out = ComposioToolBlock
            .run(&input, &testing::ctx())
            .await
            .unwrap();
        assert_eq!(out["provider"], "GMAIL");
        assert_eq!(out["result"]["ok"], true);
        assert_eq!(out["result"]["echo"]["args"]["to"], "a@b.c");
    }
}
