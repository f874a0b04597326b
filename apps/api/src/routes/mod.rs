pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::editor::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/schemas/:kind", get(handlers::handle_get_schema))
        .route("/api/v1/quality", post(handlers::handle_score))
        // Editor sessions
        .route("/api/v1/editor/sessions", post(handlers::handle_open))
        .route(
            "/api/v1/editor/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_cancel),
        )
        .route(
            "/api/v1/editor/sessions/:id/fields",
            patch(handlers::handle_set_field),
        )
        .route(
            "/api/v1/editor/sessions/:id/draft",
            axum::routing::delete(handlers::handle_discard_draft),
        )
        .route(
            "/api/v1/editor/sessions/:id/draft/restore",
            post(handlers::handle_restore_draft),
        )
        .route(
            "/api/v1/editor/sessions/:id/commit",
            post(handlers::handle_commit),
        )
        .route(
            "/api/v1/editor/sessions/:id/uploads/:field",
            post(handlers::handle_upload),
        )
        .with_state(state)
}
