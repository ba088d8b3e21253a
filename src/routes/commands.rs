use crate::{AppState, handlers::commands};
use axum::{
    Router,
    routing::{get, put},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(commands::get_commands).post(commands::create_command),
        )
        .route(
            "/{id}",
            get(commands::get_command).delete(commands::delete_command),
        )
        .route("/{id}/status", put(commands::update_command_status))
}
