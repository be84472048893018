mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:session_id", get(handlers::get_session))
        .route("/sessions/:session_id/responses", post(handlers::submit_response))
        .route("/sessions/:session_id/finish", post(handlers::finish_session))
        .route("/blueprints/:slug", get(handlers::get_blueprint))
}
