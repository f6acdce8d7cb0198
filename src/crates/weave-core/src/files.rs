//! Portable references to object-storage blobs.

use serde::{Deserialize, Serialize};

/// Reference to a file stored in object storage.
///
/// Designed to be frontend-friendly and portable across nodes. Signed
/// URLs are ephemeral; the backend re-signs them on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRef {
    /// Database id, when persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Storage provider tag.
    #[serde(default = "default_storage")]
    pub storage: String,

    pub bucket: String,

    /// Object path inside the bucket.
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

fn default_storage() -> String {
    "supabase".to_string()
}

/// Canonical output envelope for nodes that produce files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilesOutput {
    pub files: Vec<FileRef>,
}

/// A file asset to persist alongside its run.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub run_id: i64,
    pub node_id: String,
    pub storage: String,
    pub bucket: String,
    pub path: String,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub signed_url: Option<String>,
    pub signed_url_expires_at: Option<String>,
    pub public_url: Option<String>,
}
