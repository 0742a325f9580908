use axum::Router;

use crate::device::routes as device_config;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the full axum Router with all routes.
pub fn build_router(state: AppState) -> Router {
    // WebSocket relay endpoint (channel key via query param)
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    // Per-device config records
    let device_routes = Router::new()
        .route(
            "/api/devices/{id}/config",
            axum::routing::get(device_config::get_device_config),
        )
        .route(
            "/api/devices/{id}/config",
            axum::routing::patch(device_config::update_device_config),
        );

    // Root status string and health check
    let status_routes = Router::new()
        .route("/", axum::routing::get(root_status))
        .route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(ws_routes)
        .merge(device_routes)
        .merge(status_routes)
        .with_state(state)
}

/// Static confirmation string at the root path.
async fn root_status() -> &'static str {
    "ESP32-CAM Multi-Stream WebSocket Relay Running."
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
