use crate::{AppState, handlers::service_types};
use axum::{
    Router,
    routing::{delete, get},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(service_types::get_service_types).post(service_types::create_service_type),
        )
        // POST on a single type appends a service to it.
        .route(
            "/{id}",
            get(service_types::get_service_type)
                .post(service_types::add_service)
                .put(service_types::update_service_type)
                .delete(service_types::delete_service_type),
        )
        .route(
            "/{id}/services/{service_id}",
            delete(service_types::delete_service),
        )
}
