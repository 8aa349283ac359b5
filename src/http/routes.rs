use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use crate::http::state::AppState;
use crate::http::handlers::{events, health, presets, sessions};

pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/sessions", get(sessions::list_sessions))
        .route("/api/sessions/{id}", get(sessions::get_session))
        .route("/api/sessions/{id}/stop", post(sessions::stop_session))
        // One launch route per collaboration mode
        .route("/api/sessions/supervision", post(sessions::launch_supervision))
        .route("/api/sessions/parallel", post(sessions::launch_parallel))
        .route("/api/sessions/loop", post(sessions::launch_loop))
        .route("/api/sessions/hivemind", post(sessions::launch_hivemind))
        .route("/api/presets", get(presets::list_presets))
        .route("/api/events", get(events::stream_events))
        .layer(cors)
        .with_state(state)
}
