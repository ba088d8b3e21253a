use crate::{AppState, handlers::categories};
use axum::{
    Router,
    routing::{get, put},
};

/// Reads need any token; writes need the `store` role.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(categories::get_categories).post(categories::create_category),
        )
        .route(
            "/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/{id}/image", put(categories::update_category_image))
}
