use crate::{AppState, handlers::promo_codes};
use axum::{Router, routing::get};

pub fn routes() -> Router<AppState> {
    Router::new()
        // GET is public so checkout pages can show running offers.
        .route(
            "/",
            get(promo_codes::get_promo_codes).post(promo_codes::create_promo_code),
        )
        .route(
            "/{id}",
            get(promo_codes::get_promo_code)
                .put(promo_codes::update_promo_code)
                .delete(promo_codes::delete_promo_code),
        )
}
