//! Object-storage output block.

use async_trait::async_trait;
use base64::Engine;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use weave_core::files::{FileRecord, FileRef, FilesOutput};
use weave_core::template::{block_context, render_str, RenderMode};
use weave_core::{Block, BlockError, BlockInput, RunContext};

/// `file.save` — upload content to the object store and persist a
/// file-asset record.
///
/// Content resolution order: explicit `settings.content` (data URL /
/// base64 / text / JSON value), then the first upstream `FileRef`.
pub struct FileSaveBlock;

#[derive(Debug, Deserialize)]
struct FileSaveSettings {
    path: String,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    use_public_url: bool,
    #[serde(default)]
    bucket: Option<String>,
}

#[async_trait]
impl Block for FileSaveBlock {
    fn type_name(&self) -> &'static str {
        "file.save"
    }

    fn summary(&self) -> &'static str {
        "Save bytes to object storage and persist a file asset record"
    }

    fn settings_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "Object path within bucket, e.g. generated/123.png"},
                "content": {"description": "Content: base64 string (data URL prefix optional), text, or JSON value"},
                "content_type": {"type": ["string", "null"]},
                "use_public_url": {"type": "boolean", "default": false},
                "bucket": {"type": ["string", "null"], "description": "Override storage bucket"}
            },
            "required": ["path"]
        })
    }

    fn output_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {"files": {"type": "array"}},
            "required": ["files"]
        }))
    }

    async fn run(&self, input: &BlockInput, ctx: &RunContext) -> Result<Value, BlockError> {
        let store = ctx.store.clone().ok_or_else(|| {
            BlockError::Dependency(
                "object storage is not configured; set SUPABASE_URL, SUPABASE_SERVICE_KEY and SUPABASE_STORAGE_BUCKET".to_string(),
            )
        })?;

        let settings: FileSaveSettings = input.settings_as()?;
        let context = block_context(input);
        let path = render_str(&settings.path, &context, RenderMode::Strict)?;
        let bucket = settings
            .bucket
            .clone()
            .unwrap_or_else(|| store.bucket().to_string());

        let mut content_type = settings.content_type.clone();
        let bytes = match &settings.content {
            None => resolve_upstream_file(input, ctx, &mut content_type).await?,
            Some(Value::String(raw)) => {
                let text = render_str(raw, &context, RenderMode::Strict)?;
                decode_string_content(&text, &mut content_type)
            }
            Some(other) => {
                content_type.get_or_insert_with(|| "application/json".to_string());
                serde_json::to_vec(other)?
            }
        };

        let effective_type = content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        store
            .upload_bytes(&path, &bytes, &effective_type)
            .await
            .map_err(BlockError::Remote)?;

        let ttl = ctx.signed_url_expires_secs;
        let signed_url = store
            .create_signed_url(&path, ttl)
            .await
            .map_err(BlockError::Remote)?;
        let public_url = settings.use_public_url.then(|| store.public_url(&path));
        let expires_at = (Utc::now() + Duration::seconds(ttl as i64)).to_rfc3339();

        let asset_id = match &ctx.files {
            Some(files) => files
                .record(FileRecord {
                    run_id: ctx.run_id,
                    node_id: input.node_id.clone(),
                    storage: "supabase".to_string(),
                    bucket: bucket.clone(),
                    path: path.clone(),
                    content_type: content_type.clone(),
                    size: Some(bytes.len() as u64),
                    signed_url: Some(signed_url.clone()),
                    signed_url_expires_at: Some(expires_at),
                    public_url: public_url.clone(),
                })
                .await
                .map(Some)
                .map_err(BlockError::Internal)?,
            None => None,
        };

        ctx.log(
            "file.save: uploaded",
            Some(json!({
                "path": path,
                "bucket": bucket,
                "size": bytes.len(),
                "content_type": content_type,
            })),
            Some(&input.node_id),
        )
        .await;

        let file_ref = FileRef {
            id: asset_id.map(|id| id.to_string()),
            storage: "supabase".to_string(),
            bucket,
            path,
            content_type,
            size: Some(bytes.len() as u64),
            signed_url: Some(signed_url),
            public_url,
        };
        Ok(serde_json::to_value(FilesOutput {
            files: vec![file_ref],
        })?)
    }
}

/// Decode explicit string content: data URL, then plain base64, then
/// raw text.
fn decode_string_content(text: &str, content_type: &mut Option<String>) -> Vec<u8> {
    let b64 = base64::engine::general_purpose::STANDARD;

    if let Some(rest) = text.strip_prefix("data:") {
        if let Some((meta, payload)) = rest.split_once(";base64,") {
            if let Ok(bytes) = b64.decode(payload.as_bytes()) {
                if content_type.is_none() && !meta.is_empty() {
                    *content_type = Some(meta.to_string());
                }
                return bytes;
            }
        }
    }

    if let Ok(bytes) = b64.decode(text.as_bytes()) {
        content_type.get_or_insert_with(|| "application/octet-stream".to_string());
        return bytes;
    }

    content_type.get_or_insert_with(|| "text/plain; charset=utf-8".to_string());
    text.as_bytes().to_vec()
}

/// Find the first upstream `FileRef` and download its bytes, re-signing
/// the URL when the source only has a path.
async fn resolve_upstream_file(
    input: &BlockInput,
    ctx: &RunContext,
    content_type: &mut Option<String>,
) -> Result<Vec<u8>, BlockError> {
    let file_ref = input
        .upstream
        .values()
        .filter_map(|output| output.get("files"))
        .filter_map(Value::as_array)
        .filter_map(|files| files.first())
        .find_map(|first| serde_json::from_value::<FileRef>(first.clone()).ok())
        .ok_or_else(|| {
            BlockError::Config("file.save requires 'content' or an upstream file".to_string())
        })?;

    if content_type.is_none() {
        *content_type = file_ref.content_type.clone();
    }

    let signed = match &file_ref.signed_url {
        Some(url) => url.clone(),
        None => {
            let store = ctx.store.clone().ok_or_else(|| {
                BlockError::Dependency("object storage is not configured".to_string())
            })?;
            store
                .create_signed_url(&file_ref.path, ctx.signed_url_expires_secs)
                .await
                .map_err(|e| {
                    BlockError::Remote(format!(
                        "file.save could not re-sign upstream file {}: {e}",
                        file_ref.path
                    ))
                })?
        }
    };

    let response = ctx
        .http
        .get(&signed)
        .send()
        .await
        .map_err(|e| BlockError::Remote(format!("file.save: download failed: {e}")))?;
    if !response.status().is_success() {
        return Err(BlockError::Remote(format!(
            "file.save: download returned {}",
            response.status()
        )));
    }
    Ok(response
        .bytes()
        .await
        .map_err(|e| BlockError::Remote(format!("file.save: read failed: {e}")))?
        .to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_content_sets_type_and_decodes() {
        let mut content_type = None;
        let bytes = decode_string_content("data:image/png;base64,aGVsbG8=", &mut content_type);
        assert_eq!(bytes, b"hello");
        assert_eq!(content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn plain_base64_decodes_as_octet_stream() {
        let mut content_type = None;
        let bytes = decode_string_content("aGVsbG8=", &mut content_type);
        assert_eq!(bytes, b"hello");
        assert_eq!(content_type.as_deref(), Some("application/octet-stream"));
    }

    #[test]
    fn non_base64_text_stays_text() {
        let mut content_type = None;
        let bytes = decode_string_content("hello world!", &mut content_type);
        assert_eq!(bytes, b"hello world!");
        assert_eq!(content_type.as_deref(), Some("text/plain; charset=utf-8"));
    }

    #[tokio::test]
    async fn missing_store_is_dependency_error() {
        let input = BlockInput::new("f", json!({"path": "a/b.txt", "content": "x"}));
        let err = FileSaveBlock
            .run(&input, &crate::testing::ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, BlockError::Dependency(_)));
    }
}
