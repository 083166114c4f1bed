use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{board, scan, status};
use crate::infra::app_state::AppState;

/// Assemble the full router: scan endpoints, board endpoints, and the
/// status probe, behind trace and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors_allowed_origins);

    Router::new()
        .route("/api/status", get(status::status))
        .route("/api/scan-url", get(scan::mint_scan_url))
        .route("/scan", get(scan::handle_scan))
        .route("/api/scanner", post(scan::scanner_device))
        .route("/api/scan-states", get(scan::scan_states))
        .route("/api/board", get(board::get_board))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any())
}
