use crate::{AppState, handlers::service_providers as sp};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Service provider routes.
///
/// Static segments (`register`, `verifyPhone`, `closest`, `me`, `available`) take priority
/// over `{id}` in the router, so they never reach the id extractor.
pub fn routes() -> Router<AppState> {
    Router::new()
        // --- Public ---
        .route("/register", post(sp::register_service_provider))
        .route("/verifyPhone", post(sp::verify_phone))
        .route("/closest", post(sp::closest_emergency_ready))
        // --- Role scoped listings ---
        .route("/", get(sp::get_service_providers))
        .route("/me/balance", get(sp::get_my_balance))
        .route("/available", get(sp::get_available))
        // --- Single provider ---
        .route("/{id}", get(sp::get_service_provider))
        .route("/{id}/picture", put(sp::set_profile_picture))
        .route("/{id}/interventions", get(sp::get_interventions))
        .route("/{id}/commands", get(sp::get_commands))
        .route(
            "/{id}/payments",
            get(sp::get_payments).post(sp::add_payment),
        )
        .route("/{id}/validate", put(sp::validate_service_provider))
        .route("/{id}/percentToPay", put(sp::set_percent_to_pay))
        .route("/{id}/state", put(sp::set_state))
        .route("/{id}/services", put(sp::set_services))
        .route("/{id}/ban", put(sp::ban_service_provider))
}
