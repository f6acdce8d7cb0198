//! Third-party credential binding.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A connected third-party account, opaque to the engine: blocks only
/// need the `connected_account_id` for the provider call.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct IntegrationAccount {
    pub id: i64,
    pub user_id: String,
    pub toolkit: String,
    pub connected_account_id: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl IntegrationAccount {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}
