use crate::{AppState, handlers::auth};
use axum::{Router, routing::post};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        // Admin-only: provisions admin, store and client accounts.
        .route("/accounts", post(auth::create_account))
}
