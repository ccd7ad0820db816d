pub mod safety;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Build the service router
pub fn build_routes(state: Arc<AppState>, max_request_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(safety::routes())
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
