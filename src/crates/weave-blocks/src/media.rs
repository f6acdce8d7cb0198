//! Inline media descriptor passed between audio/file blocks.

use serde::{Deserialize, Serialize};

/// A media payload carried inline as base64, optionally with a source
/// URI for re-fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    /// One of `audio`, `image`, `file`.
    pub kind: String,
    pub mime: String,
    pub bytes_b64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}
