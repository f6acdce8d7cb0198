//! Server-side implementations of the run-context capabilities.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use weave_core::context::{AccountResolver, FileSink, LogLevel, LogSink};
use weave_core::files::FileRecord;
use weave_core::RunContext;

use crate::db::models::Run;
use crate::db::repositories::{FileAssetRepository, IntegrationAccountRepository, LogRepository};
use crate::db::DatabasePool;
use crate::state::AppState;
use crate::engine::EngineError;

/// Log sink writing to the `logs` table. Each append is committed on
/// its own so streaming readers see entries immediately; failures are
/// reported to tracing rather than failing the block.
pub struct DbLogSink {
    pool: DatabasePool,
    run_id: i64,
    user_id: Option<String>,
}

#[async_trait]
impl LogSink for DbLogSink {
    async fn append(
        &self,
        level: LogLevel,
        message: &str,
        data: Option<Value>,
        node_id: Option<&str>,
    ) {
        if let Err(e) = LogRepository::append(
            &self.pool,
            self.run_id,
            self.user_id.as_deref(),
            node_id,
            level.as_str(),
            message,
            data.as_ref(),
        )
        .await
        {
            warn!(run_id = self.run_id, error = %e, "failed to append run log");
        }
    }
}

/// Integration-account lookup backed by the database.
pub struct DbAccountResolver {
    pool: DatabasePool,
}

#[async_trait]
impl AccountResolver for DbAccountResolver {
    async fn resolve(&self, user_id: &str, toolkit: &str) -> Option<String> {
        IntegrationAccountRepository::latest_active(&self.pool, user_id, toolkit)
            .await
            .ok()
            .flatten()
    }
}

/// File-asset sink backed by the database.
pub struct DbFileSink {
    pool: DatabasePool,
}

#[async_trait]
impl FileSink for DbFileSink {
    async fn record(&self, record: FileRecord) -> Result<i64, String> {
        FileAssetRepository::create(&self.pool, &record)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Assemble the capability bundle for one run. The HTTP client is
/// per-run and dropped with it.
pub fn build_run_context(state: &AppState, run: &Run) -> Result<RunContext, EngineError> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| EngineError::Internal(format!("failed to build HTTP client: {e}")))?;

    let mut ctx = RunContext::new(
        run.id,
        run.user_id.clone(),
        http,
        state.registry.clone(),
        state.chat.clone(),
        state.llm_enabled,
        Arc::new(DbLogSink {
            pool: state.pool.clone(),
            run_id: run.id,
            user_id: run.user_id.clone(),
        }),
    )
    .with_accounts(Arc::new(DbAccountResolver {
        pool: state.pool.clone(),
    }))
    .with_files(Arc::new(DbFileSink {
        pool: state.pool.clone(),
    }))
    .with_composio_api_key(state.settings.composio_api_key.clone())
    .with_signed_url_expires_secs(state.settings.signed_url_expires_secs);

    if let Some(store) = &state.store {
        ctx = ctx.with_store(store.clone());
    }
    Ok(ctx)
}
