//! Weave server binary.

use std::net::SocketAddr;

use anyhow::Context;

use weave_server::api::routes::create_router;
use weave_server::config::Settings;
use weave_server::db::Database;
use weave_server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let settings = Settings::from_env();
    tracing::info!(
        database_url = %settings.database_url,
        llm = settings.openai_api_key.is_some(),
        storage = settings.supabase_configured(),
        "starting weave server"
    );

    let db = Database::initialize(&settings.database_url)
        .await
        .context("database initialization failed")?;

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .context("invalid HOST/PORT")?;

    let state = AppState::new(settings, db);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
