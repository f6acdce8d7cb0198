//! Run-scoped capability bundle injected into blocks.
//!
//! A [`RunContext`] is built once per run by the server and handed to
//! every block invocation. Capabilities are injected — blocks never
//! reach global state directly. Optional capabilities (object store,
//! integration accounts) are `None` when unconfigured; blocks that
//! need them fail with a dependency error.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::files::FileRecord;
use crate::llm::ChatModel;
use crate::registry::BlockRegistry;

/// Severity of an engine log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Destination for engine progress logs.
///
/// Implementations must append durably before returning so a separate
/// reader session observes the entry promptly.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(
        &self,
        level: LogLevel,
        message: &str,
        data: Option<Value>,
        node_id: Option<&str>,
    );
}

/// Object storage used by file-producing blocks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload bytes, returning a storage URI such as
    /// `supabase://bucket/path`.
    async fn upload_bytes(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<String, String>;

    /// Create a signed URL with a bounded TTL.
    async fn create_signed_url(&self, path: &str, expires_secs: u64) -> Result<String, String>;

    /// Public URL for the object, valid only when the bucket is public.
    fn public_url(&self, path: &str) -> String;

    fn bucket(&self) -> &str;
}

/// Lookup of third-party integration credentials, scoped to a user and
/// toolkit. Returns the most recent active connected account id.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    async fn resolve(&self, user_id: &str, toolkit: &str) -> Option<String>;
}

/// Sink for persisted file assets; returns the stored asset id.
#[async_trait]
pub trait FileSink: Send + Sync {
    async fn record(&self, record: FileRecord) -> Result<i64, String>;
}

/// The capability bundle handed to every block invocation in a run.
#[derive(Clone)]
pub struct RunContext {
    pub run_id: i64,
    pub user_id: Option<String>,

    /// Per-run HTTP client, closed with the run.
    pub http: reqwest::Client,

    /// The block registry, for agent tool sub-execution.
    pub registry: Arc<BlockRegistry>,

    /// Chat model; the offline fallback when no provider is configured.
    pub chat: Arc<dyn ChatModel>,

    /// Whether a real LLM provider is configured. Blocks degrade to
    /// deterministic stubs when false.
    pub llm_enabled: bool,

    pub store: Option<Arc<dyn ObjectStore>>,
    pub accounts: Option<Arc<dyn AccountResolver>>,
    pub files: Option<Arc<dyn FileSink>>,

    pub composio_api_key: Option<String>,
    pub signed_url_expires_secs: u64,

    log: Arc<dyn LogSink>,
}

impl RunContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: i64,
        user_id: Option<String>,
        http: reqwest::Client,
        registry: Arc<BlockRegistry>,
        chat: Arc<dyn ChatModel>,
        llm_enabled: bool,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            run_id,
            user_id,
            http,
            registry,
            chat,
            llm_enabled,
            store: None,
            accounts: None,
            files: None,
            composio_api_key: None,
            signed_url_expires_secs: 3600,
            log,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_accounts(mut self, accounts: Arc<dyn AccountResolver>) -> Self {
        self.accounts = Some(accounts);
        self
    }

    pub fn with_files(mut self, files: Arc<dyn FileSink>) -> Self {
        self.files = Some(files);
        self
    }

    pub fn with_composio_api_key(mut self, key: Option<String>) -> Self {
        self.composio_api_key = key;
        self
    }

    pub fn with_signed_url_expires_secs(mut self, secs: u64) -> Self {
        self.signed_url_expires_secs = secs;
        self
    }

    /// Append an info-level progress log.
    pub async fn log(&self, message: &str, data: Option<Value>, node_id: Option<&str>) {
        self.log.append(LogLevel::Info, message, data, node_id).await;
    }

    pub async fn warn(&self, message: &str, data: Option<Value>, node_id: Option<&str>) {
        self.log.append(LogLevel::Warn, message, data, node_id).await;
    }

    pub async fn error(&self, message: &str, data: Option<Value>, node_id: Option<&str>) {
        self.log.append(LogLevel::Error, message, data, node_id).await;
    }
}

/// Log sink that drops everything; test scaffolding.
pub struct NullLogSink;

#[async_trait]
impl LogSink for NullLogSink {
    async fn append(
        &self,
        _level: LogLevel,
        _message: &str,
        _data: Option<Value>,
        _node_id: Option<&str>,
    ) {
    }
}
