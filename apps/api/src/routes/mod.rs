pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::candidates::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/candidates/apply", post(handlers::handle_apply))
        .route("/candidates/upload", post(handlers::handle_upload))
        .route("/candidates/:id", get(handlers::handle_get_candidate))
        .layer(body_limit)
        .with_state(state)
}
