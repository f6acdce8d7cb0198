//! Remote provider configuration.

use std::time::Duration;

/// Connection settings for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct RemoteLlmConfig {
    pub api_key: String,
    pub base_url: String,
    /// Default model when the request doesn't name one.
    pub model: String,
    pub timeout: Duration,
}

impl RemoteLlmConfig {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Build from an environment variable; `None` when the key is
    /// unset or empty (callers fall back to the offline model).
    pub fn from_env(api_key_var: &str, base_url: &str, model: &str) -> Option<Self> {
        let api_key = std::env::var(api_key_var).ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self::new(api_key, base_url, model))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
