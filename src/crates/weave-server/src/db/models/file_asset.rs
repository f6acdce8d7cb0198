//! Persisted file asset.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored object-storage blob. Outlives its run; signed URLs are
/// refreshed on demand.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileAsset {
    pub id: i64,
    pub run_id: i64,
    pub node_id: String,
    pub storage: String,
    pub bucket: String,
    pub path: String,
    pub content_type: Option<String>,
    pub size: Option<i64>,
    pub signed_url: Option<String>,
    pub signed_url_expires_at: Option<String>,
    pub public_url: Option<String>,
    pub created_at: String,
}
