//! Route table and middleware stack.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::state::AppState;

/// Build the complete API router.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        .route("/health", get(handlers::health::health))
        // Workflows
        .route(
            "/workflows",
            post(handlers::workflows::create_workflow).get(handlers::workflows::list_workflows),
        )
        .route(
            "/workflows/:id",
            get(handlers::workflows::get_workflow)
                .put(handlers::workflows::update_workflow)
                .delete(handlers::workflows::delete_workflow),
        )
        .route("/validate-graph", post(handlers::workflows::validate_graph))
        // Runs
        .route("/workflows/:id/run", post(handlers::runs::start_run))
        .route("/runs", get(handlers::runs::list_runs))
        .route("/runs/:id", get(handlers::runs::get_run))
        .route("/runs/:id/logs", get(handlers::runs::get_run_logs))
        .route("/runs/:id/logs/stream", get(handlers::runs::stream_run_logs))
        .route("/runs/:id/stream", get(handlers::runs::stream_run_logs))
        // Webhooks
        .route("/hooks/:slug", post(handlers::hooks::webhook_trigger))
        // Registry catalog
        .route("/blocks", get(handlers::blocks::get_blocks))
        .route("/block-specs", get(handlers::blocks::get_block_specs))
        // Integrations
        .route(
            "/integrations/accounts",
            get(handlers::integrations::list_accounts)
                .post(handlers::integrations::create_account),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.settings.cors_origins;
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<axum::http::HeaderValue> =
            origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
