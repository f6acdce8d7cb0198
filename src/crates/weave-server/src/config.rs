//! Environment-driven server settings.
//!
//! Absent LLM / storage / integration keys downgrade the matching
//! features to deterministic stubs; nothing here is required for a
//! local run beyond the defaults.

use std::str::FromStr;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// CSV of allowed origins; `*` allows any.
    pub cors_origins: Vec<String>,

    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,

    pub composio_api_key: Option<String>,
    pub composio_toolkits: Vec<String>,

    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub supabase_storage_bucket: Option<String>,
    pub signed_url_expires_secs: u64,

    /// Redirect target for integration callbacks.
    pub frontend_base_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self {
            database_url: env_or("DATABASE_URL", "sqlite:weave.db"),
            host: env_or("HOST", "127.0.0.1"),
            port: env_parse_or("PORT", 8000),
            cors_origins: env_csv("CORS_ORIGINS", "*"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_base_url: env_or("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
            openai_model: env_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            composio_api_key: env_opt("COMPOSIO_API_KEY"),
            composio_toolkits: env_csv("COMPOSIO_TOOLKITS", "GMAIL,GOOGLE_DRIVE,SLACK"),
            supabase_url: env_opt("SUPABASE_URL"),
            supabase_service_key: env_opt("SUPABASE_SERVICE_KEY"),
            supabase_storage_bucket: env_opt("SUPABASE_STORAGE_BUCKET"),
            signed_url_expires_secs: env_parse_or("SUPABASE_SIGNED_URL_EXPIRES_SECS", 3600),
            frontend_base_url: env_opt("FRONTEND_BASE_URL"),
        }
    }

    /// Defaults suitable for tests: in-memory database, no providers.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            composio_api_key: None,
            composio_toolkits: vec!["GMAIL".to_string()],
            supabase_url: None,
            supabase_service_key: None,
            supabase_storage_bucket: None,
            signed_url_expires_secs: 3600,
            frontend_base_url: None,
        }
    }

    pub fn supabase_configured(&self) -> bool {
        self.supabase_url.is_some()
            && self.supabase_service_key.is_some()
            && self.supabase_storage_bucket.is_some()
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_opt(key)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_csv(key: &str, default: &str) -> Vec<String> {
    env_or(key, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_offline() {
        let settings = Settings::for_tests();
        assert!(settings.openai_api_key.is_none());
        assert!(!settings.supabase_configured());
        assert_eq!(settings.cors_origins, vec!["*"]);
    }
}
