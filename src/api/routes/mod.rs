pub mod health;
pub mod sessions;
pub mod ui;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::{middleware::request_logger, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.config.cors.allowed_origins);
    let body_limit = state.config.config.upload.max_bytes;

    let router = Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_v1_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_logger))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    match cors {
        Some(cors) => router.layer(cors).with_state(state),
        None => router.with_state(state),
    }
}

/// No origins configured means same-origin only: no CORS headers are sent.
fn build_cors(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        Some(cors.allow_origin(Any))
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        Some(cors.allow_origin(origins))
    }
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(sessions::create_session))
        .route(
            "/sessions/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/sessions/{id}/upload", post(sessions::upload))
        .route("/sessions/{id}/directory", post(sessions::ingest_directory))
        .route("/sessions/{id}/query", post(sessions::query))
        .route("/sessions/{id}/chat", post(sessions::chat))
        .route("/sessions/{id}/search", post(sessions::search))
        .route("/sessions/{id}/history", delete(sessions::clear_history))
        .route("/sessions/{id}/reset", post(sessions::reset))
}
