//! Router assembly, one module per resource. Each router is nested under `/api` by
//! `create_router`; access control lives in the handlers' extractors.

pub mod auth;
pub mod categories;
pub mod commands;
pub mod promo_codes;
pub mod public;
pub mod service_providers;
pub mod service_types;

use axum::Router;

use crate::AppState;

/// Every resource router, nested under its collection path.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/categories", categories::routes())
        .nest("/commands", commands::routes())
        .nest("/promoCodes", promo_codes::routes())
        .nest("/serviceProviders", service_providers::routes())
        .nest("/serviceTypes", service_types::routes())
}
