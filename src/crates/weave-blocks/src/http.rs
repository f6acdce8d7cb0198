//! HTTP fetch blocks.
//!
//! `http.request` returns the response body parsed best-effort;
//! `web.get` adds an explicit `response_mode` with a parse-fallback
//! ladder. Both fail-stop on network errors and surface expired
//! deadlines as timeout errors.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use weave_core::template::{block_context, render_str, RenderMode};
use weave_core::{Block, BlockError, BlockInput, RunContext};

#[derive(Debug, Deserialize)]
struct HttpSettings {
    #[serde(default = "default_method")]
    method: String,
    url: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default = "default_true")]
    follow_redirects: bool,
    #[serde(default = "default_timeout")]
    timeout_seconds: f64,
    #[serde(default = "default_mode")]
    response_mode: String,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> f64 {
    30.0
}

fn default_mode() -> String {
    "auto".to_string()
}

fn http_settings_schema(with_response_mode: bool) -> Value {
    let mut properties = json!({
        "method": {"type": "string", "default": "GET", "description": "HTTP method"},
        "url": {"type": "string", "description": "Request URL (supports {{ }} substitutions)"},
        "headers": {"type": "object", "additionalProperties": {"type": "string"}},
        "body": {"description": "JSON body or raw content (supports {{ }} if string)"},
        "follow_redirects": {"type": "boolean", "default": true},
        "timeout_seconds": {"type": "number", "minimum": 0, "default": 30.0}
    });
    if with_response_mode {
        properties["response_mode"] = json!({
            "type": "string",
            "enum": ["auto", "json", "text", "bytes"],
            "default": "auto",
            "description": "How to parse the response body"
        });
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": ["url"]
    })
}

struct FetchResult {
    status: u16,
    headers: Map<String, Value>,
    bytes: Vec<u8>,
}

async fn fetch(
    input: &BlockInput,
    ctx: &RunContext,
    settings: &HttpSettings,
    block_name: &str,
) -> Result<FetchResult, BlockError> {
    let context = block_context(input);
    let url = render_str(&settings.url, &context, RenderMode::Strict)?;
    let body = match &settings.body {
        Some(Value::String(raw)) => Some(Value::String(render_str(raw, &context, RenderMode::Strict)?)),
        other => other.clone(),
    };

    let method = reqwest::Method::from_bytes(settings.method.to_uppercase().as_bytes())
        .map_err(|_| BlockError::Config(format!("invalid HTTP method '{}'", settings.method)))?;

    let body_preview = match &body {
        Some(Value::String(s)) => Some(Value::String(s.chars().take(500).collect())),
        Some(other) => Some(other.clone()),
        None => None,
    };
    ctx.log(
        &format!("{block_name}: sending {method} {url}"),
        Some(json!({
            "method": method.as_str(),
            "url": url,
            "headers": settings.headers,
            "body_preview": body_preview,
            "follow_redirects": settings.follow_redirects,
            "timeout_seconds": settings.timeout_seconds,
        })),
        Some(&input.node_id),
    )
    .await;

    // The shared client follows redirects; opting out needs its own
    // client since the policy is client-level in reqwest.
    let client = if settings.follow_redirects {
        ctx.http.clone()
    } else {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| BlockError::Internal(e.to_string()))?
    };

    let mut request = client
        .request(method, &url)
        .timeout(Duration::from_secs_f64(settings.timeout_seconds.max(0.0)));
    for (name, value) in &settings.headers {
        request = request.header(name, value);
    }
    request = match body {
        Some(value @ (Value::Object(_) | Value::Array(_))) => request.json(&value),
        Some(Value::String(text)) => request.body(text),
        Some(other) if !other.is_null() => request.body(other.to_string()),
        _ => request,
    };

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            BlockError::Timeout(format!("{block_name}: request to {url} timed out"))
        } else {
            BlockError::Remote(format!("{block_name}: request failed: {e}"))
        }
    })?;

    let status = response.status().as_u16();
    let mut headers = Map::new();
    for (name, value) in response.headers() {
        headers.insert(
            name.to_string(),
            Value::String(String::from_utf8_lossy(value.as_bytes()).to_string()),
        );
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| BlockError::Remote(format!("{block_name}: failed to read body: {e}")))?
        .to_vec();

    Ok(FetchResult {
        status,
        headers,
        bytes,
    })
}

fn bytes_to_b64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// `http.request` — perform an HTTP request and return status,
/// headers and a best-effort parsed body.
pub struct HttpRequestBlock;

#[async_trait]
impl Block for HttpRequestBlock {
    fn type_name(&self) -> &'static str {
        "http.request"
    }

    fn summary(&self) -> &'static str {
        "Perform an HTTP request and return status, headers, data"
    }

    fn settings_schema(&self) -> Value {
        http_settings_schema(false)
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "status": {"type": "integer"},
                "headers": {"type": "object"},
                "data": {}
            },
            "required": ["status", "headers"]
        }))
    }

    async fn run(&self, input: &BlockInput, ctx: &RunContext) -> Result<Value, BlockError> {
        let settings: HttpSettings = input.settings_as()?;
        let result = fetch(input, ctx, &settings, "http.request").await?;

        let data = match serde_json::from_slice::<Value>(&result.bytes) {
            Ok(parsed) => parsed,
            Err(_) => match String::from_utf8(result.bytes.clone()) {
                Ok(text) => Value::String(text),
                Err(_) => Value::String(bytes_to_b64(&result.bytes)),
            },
        };

        ctx.log(
            &format!("http.request: received {}", result.status),
            Some(json!({"status": result.status, "headers": result.headers})),
            Some(&input.node_id),
        )
        .await;

        Ok(json!({
            "status": result.status,
            "headers": result.headers,
            "data": data,
        }))
    }
}

/// `web.get` — HTTP request with an explicit response-parsing mode and
/// the full `{data, data_text, data_json, response_mode}` output.
pub struct WebGetBlock;

#[async_trait]
impl Block for WebGetBlock {
    fn type_name(&self) -> &'static str {
        "web.get"
    }

    fn summary(&self) -> &'static str {
        "HTTP request with parsed outputs: status, headers, data, data_text, data_json"
    }

    fn settings_schema(&self) -> Value {
        http_settings_schema(true)
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "status": {"type": "integer"},
                "headers": {"type": "object"},
                "data": {},
                "data_text": {"type": ["string", "null"]},
                "data_json": {},
                "response_mode": {"type": "string", "enum": ["json", "text", "bytes"]}
            },
            "required": ["status", "headers", "response_mode"]
        }))
    }

    async fn run(&self, input: &BlockInput, ctx: &RunContext) -> Result<Value, BlockError> {
        let settings: HttpSettings = input.settings_as()?;
        let result = fetch(input, ctx, &settings, "web.get").await?;

        let as_json = || serde_json::from_slice::<Value>(&result.bytes).ok();
        let as_text = || String::from_utf8(result.bytes.clone()).ok();

        let mut data_json: Option<Value> = None;
        let mut data_text: Option<String> = None;

        let (data, chosen_mode) = match settings.response_mode.as_str() {
            "json" => match as_json() {
                Some(parsed) => {
                    data_json = Some(parsed.clone());
                    (parsed, "json")
                }
                None => match as_text() {
                    Some(text) => {
                        data_text = Some(text.clone());
                        (Value::String(text), "text")
                    }
                    None => (Value::String(bytes_to_b64(&result.bytes)), "bytes"),
                },
            },
            "text" => match as_text() {
                Some(text) => {
                    data_text = Some(text.clone());
                    (Value::String(text), "text")
                }
                None => match as_json() {
                    Some(parsed) => {
                        data_json = Some(parsed.clone());
                        (parsed, "json")
                    }
                    None => (Value::String(bytes_to_b64(&result.bytes)), "bytes"),
                },
            },
            "bytes" => (Value::String(bytes_to_b64(&result.bytes)), "bytes"),
            // auto
            _ => match as_json() {
                Some(parsed) => {
                    data_json = Some(parsed.clone());
                    (parsed, "json")
                }
                None => match as_text() {
                    Some(text) => {
                        data_text = Some(text.clone());
                        (Value::String(text), "text")
                    }
                    None => (Value::String(bytes_to_b64(&result.bytes)), "bytes"),
                },
            },
        };

        ctx.log(
            &format!("web.get: received {}", result.status),
            Some(json!({
                "status": result.status,
                "headers": result.headers,
                "response_mode": chosen_mode,
            })),
            Some(&input.node_id),
        )
        .await;

        Ok(json!({
            "status": result.status,
            "headers": result.headers,
            "data": data,
            "data_text": data_text,
            "data_json": data_json,
            "response_mode": chosen_mode,
        }))
    }
}
