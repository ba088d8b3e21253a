use crate::AppState;
use axum::{Router, routing::get};

/// Unauthenticated endpoints that sit outside `/api`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Load balancer check; answers without touching the database.
        .route("/health", get(|| async { "ok" }))
}
