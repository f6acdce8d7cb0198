//! Speech synthesis and transcription blocks.
//!
//! Both degrade to deterministic stubs when no provider is configured
//! so offline runs and tests stay reproducible.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use weave_core::llm::{SpeechRequest, TranscribeRequest};
use weave_core::template::{block_context, render_str, RenderMode};
use weave_core::{Block, BlockError, BlockInput, RunContext};

use crate::media::Media;

// Minimal header-like tag emitted by the keyless fallback; not real audio.
const STUB_AUDIO: &[u8] = b"\x49\x44\x33";

fn b64() -> base64::engine::GeneralPurpose {
    base64::engine::general_purpose::STANDARD
}

/// `audio.tts` — synthesize speech for a rendered text.
pub struct AudioTtsBlock;

#[derive(Debug, Deserialize)]
struct AudioTtsSettings {
    text: String,
    #[serde(default = "default_tts_model")]
    model: String,
    #[serde(default = "default_voice")]
    voice: String,
    #[serde(default = "default_format")]
    format: String,
}

fn default_tts_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_format() -> String {
    "mp3".to_string()
}

#[async_trait]
impl Block for AudioTtsBlock {
    fn type_name(&self) -> &'static str {
        "audio.tts"
    }

    fn summary(&self) -> &'static str {
        "Text to speech via the configured provider; deterministic stub when unconfigured"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string"},
                "model": {"type": "string", "default": "tts-1"},
                "voice": {"type": "string", "default": "alloy"},
                "format": {"type": "string", "enum": ["mp3", "wav"], "default": "mp3"}
            },
            "required": ["text"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"media": {"type": "object"}},
            "required": ["media"]
        }))
    }

    async fn run(&self, input: &BlockInput, ctx: &RunContext) -> Result<Value, BlockError> {
        let settings: AudioTtsSettings = input.settings_as()?;
        let context = block_context(input);
        let text = render_str(&settings.text, &context, RenderMode::Lenient)?;
        if text.is_empty() {
            return Err(BlockError::Config(
                "audio.tts requires non-empty 'text'".to_string(),
            ));
        }

        let mime = if settings.format == "mp3" {
            "audio/mpeg"
        } else {
            "audio/wav"
        };
        let filename = format!("speech.{}", settings.format);

        let bytes = if !ctx.llm_enabled {
            STUB_AUDIO.to_vec()
        } else {
            let request = SpeechRequest {
                model: settings.model.clone(),
                voice: settings.voice.clone(),
                format: settings.format.clone(),
                text: text.clone(),
            };
            match ctx.chat.speech(request).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    ctx.warn(
                        &format!("audio.tts: provider error, using silent fallback: {e}"),
                        Some(json!({"error": e.to_string()})),
                        Some(&input.node_id),
                    )
                    .await;
                    STUB_AUDIO.to_vec()
                }
            }
        };

        let media = Media {
            kind: "audio".to_string(),
            mime: mime.to_string(),
            bytes_b64: b64().encode(&bytes),
            filename: Some(filename),
            size: Some(bytes.len() as u64),
            uri: None,
        };
        Ok(json!({ "media": media }))
    }
}

/// `audio.stt` — transcribe an audio payload.
pub struct AudioSttBlock;

#[derive(Debug, Deserialize)]
struct AudioSttSettings {
    media: Value,
    #[serde(default = "default_stt_model")]
    model: String,
    #[serde(default)]
    prompt: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

fn default_stt_model() -> String {
    "whisper-1".to_string()
}

struct ResolvedAudio {
    bytes: Vec<u8>,
    mime: String,
    filename: String,
}

#[async_trait]
impl Block for AudioSttBlock {
    fn type_name(&self) -> &'static str {
        "audio.stt"
    }

    fn summary(&self) -> &'static str {
        "Speech to text via the configured provider; empty-text stub when unconfigured"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "media": {"description": "Media object, upstream reference or http(s) URL"},
                "model": {"type": "string", "default": "whisper-1"},
                "prompt": {"type": ["string", "null"]},
                "language": {"type": ["string", "null"]}
            },
            "required": ["media"]
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
        let settings: AudioSttSettings = input.settings_as()?;
        let resolved = resolve_audio(&settings.media, input, ctx).await?;

        // Keyless runs and byte counts too small to be valid audio get
        // the deterministic empty transcript.
        if !ctx.llm_enabled || resolved.bytes.len() < 1000 {
            return Ok(json!({ "text": "" }));
        }

        let request = TranscribeRequest {
            model: settings.model,
            filename: resolved.filename,
            mime: resolved.mime,
            bytes: resolved.bytes,
            prompt: settings.prompt,
            language: settings.language,
        };
        let text = ctx
            .chat
            .transcribe(request)
            .await
            .map_err(|e| BlockError::Remote(format!("audio.stt: {e}")))?;
        Ok(json!({ "text": text }))
    }
}

async fn resolve_audio(
    media: &Value,
    input: &BlockInput,
    ctx: &RunContext,
) -> Result<ResolvedAudio, BlockError> {
    let media = match media {
        Value::String(raw) => {
            let context = block_context(input);
            let rendered = render_str(raw, &context, RenderMode::Lenient)?;
            if rendered.starts_with("http://") || rendered.starts_with("https://") {
                return download_audio(&rendered, ctx).await;
            }
            serde_json::from_str::<Value>(&rendered).map_err(|_| {
                BlockError::Config(
                    "audio.stt requires 'media' as a Media object or URL".to_string(),
                )
            })?
        }
        other => other.clone(),
    };

    let media: Media = serde_json::from_value(media).map_err(|_| {
        BlockError::Config("audio.stt requires 'media' as a Media object or URL".to_string())
    })?;

    let filename = media.filename.clone().unwrap_or_else(|| "audio_input".to_string());
    let mime = if media.mime.is_empty() {
        "audio/mpeg".to_string()
    } else {
        media.mime.clone()
    };

    if !media.bytes_b64.is_empty() {
        let bytes = b64()
            .decode(media.bytes_b64.as_bytes())
            .map_err(|e| BlockError::Config(format!("audio.stt: invalid base64 media: {e}")))?;
        return Ok(ResolvedAudio {
            bytes,
            mime,
            filename,
        });
    }
    if let Some(uri) = &media.uri {
        return download_audio(uri, ctx).await;
    }
    Err(BlockError::Config(
        "audio.stt: media has neither bytes_b64 nor uri".to_string(),
    ))
}

async fn download_audio(url: &str, ctx: &RunContext) -> Result<ResolvedAudio, BlockError> {
    let response = ctx
        .http
        .get(url)
        .send()
        .await
        .map_err(|e| BlockError::Remote(format!("audio.stt: fetch failed: {e}")))?;
    if !response.status().is_success() {
        return Err(BlockError::Remote(format!(
            "audio.stt: fetch returned {}",
            response.status()
        )));
    }
    let mime = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let filename = url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("audio_input")
        .to_string();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| BlockError::Remote(format!("audio.stt: read failed: {e}")))?
        .to_vec();
    Ok(ResolvedAudio {
        bytes,
        mime,
        filename,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn tts_stub_is_deterministic_without_provider() {
        let input = BlockInput::new("t", json!({"text": "hello"}));
        let out = AudioTtsBlock.run(&input, &testing::ctx()).await.unwrap();
        let media: Media = serde_json::from_value(out["media"].clone()).unwrap();
        assert_eq!(media.kind, "audio");
        assert_eq!(media.mime, "audio/mpeg");
        assert_eq!(media.size, Some(3));
        assert_eq!(media.filename.as_deref(), Some("speech.mp3"));
    }

    #[tokio::test]
    async fn tts_empty_text_fails() {
        let input = BlockInput::new("t", json!({"text": ""}));
        assert!(AudioTtsBlock.run(&input, &testing::ctx()).await.is_err());
    }

    #[tokio::test]
    async fn stt_round_trips_tts_stub_to_empty_text() {
        let tts_out = AudioTtsBlock
            .run(&BlockInput::new("t", json!({"text": "hi"})), &testing::ctx())
            .await
            .unwrap();
        let input = BlockInput::new("s", json!({"media": tts_out["media"]}));
        let out = AudioSttBlock.run(&input, &testing::ctx()).await.unwrap();
        assert_eq!(out["text"], "");
    }

    #[tokio::test]
    async fn stt_rejects_non_media_settings() {
        let input = BlockInput::new("s", json!({"media": 42}));
        let err = AudioSttBlock
            .run(&input, &testing::ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, BlockError::Config(_)));
    }
}
