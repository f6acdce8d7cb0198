//! Shared application state.

use std::sync::Arc;

use tracing::{info, warn};

use weave_core::context::ObjectStore;
use weave_core::llm::ChatModel;
use weave_core::BlockRegistry;
use weave_llm::{OfflineChatModel, OpenAiClient, RemoteLlmConfig};

use crate::config::Settings;
use crate::db::{Database, DatabasePool};
use crate::storage::SupabaseStorage;

/// Everything the handlers and the executor share. Cheap to clone;
/// the registry is frozen at startup.
#[derive(Clone)]
pub struct AppState {
    pub pool: DatabasePool,
    pub registry: Arc<BlockRegistry>,
    pub settings: Arc<Settings>,
    pub chat: Arc<dyn ChatModel>,
    /// Whether a real LLM provider is configured; false selects the
    /// deterministic offline paths.
    pub llm_enabled: bool,
    pub store: Option<Arc<dyn ObjectStore>>,
}

impl AppState {
    pub fn new(settings: Settings, db: Database) -> Self {
        let registry = Arc::new(weave_blocks::default_registry());

        let (chat, llm_enabled): (Arc<dyn ChatModel>, bool) = match &settings.openai_api_key {
            Some(key) => {
                let config = RemoteLlmConfig::new(
                    key.clone(),
                    settings.openai_base_url.clone(),
                    settings.openai_model.clone(),
                );
                match OpenAiClient::new(config) {
                    Ok(client) => {
                        info!("LLM provider configured");
                        (Arc::new(client), true)
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to build LLM client; using offline model");
                        (Arc::new(OfflineChatModel::new()), false)
                    }
                }
            }
            None => {
                info!("no LLM API key; offline model active");
                (Arc::new(OfflineChatModel::new()), false)
            }
        };

        let store: Option<Arc<dyn ObjectStore>> = if settings.supabase_configured() {
            Some(Arc::new(SupabaseStorage::new(
                settings.supabase_url.clone().unwrap_or_default(),
                settings.supabase_service_key.clone().unwrap_or_default(),
                settings.supabase_storage_bucket.clone().unwrap_or_default(),
            )))
        } else {
            None
        };

        Self {
            pool: db.pool().clone(),
            registry,
            settings: Arc::new(settings),
            chat,
            llm_enabled,
            store,
        }
    }

    /// In-memory state for tests: offline model, no object store.
    pub async fn for_tests() -> Self {
        let db = Database::test_in_memory()
            .await
            .expect("in-memory database");
        Self::new(Settings::for_tests(), db)
    }
}
