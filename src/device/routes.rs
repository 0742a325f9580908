use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::device::store::{sanitize_id, DeviceConfig, DeviceConfigUpdate};
use crate::state::AppState;

/// GET /api/devices/{id}/config
/// Return the device's config record, creating it with defaults on first read.
pub async fn get_device_config(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceConfig>, (StatusCode, String)> {
    let key = storage_key(&device_id)?;

    let store = state.devices.clone();
    let config = tokio::task::spawn_blocking(move || store.read_or_create(&key))
        .await
        .map_err(internal_error)?;

    Ok(Json(config))
}

/// PATCH /api/devices/{id}/config
/// Merge a partial update over the device's record and return the result.
/// Unspecified fields keep their prior values.
pub async fn update_device_config(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Json(update): Json<DeviceConfigUpdate>,
) -> Result<Json<DeviceConfig>, (StatusCode, String)> {
    let key = storage_key(&device_id)?;

    let store = state.devices.clone();
    let config = tokio::task::spawn_blocking(move || store.update(&key, update))
        .await
        .map_err(internal_error)?;

    Ok(Json(config))
}

fn storage_key(device_id: &str) -> Result<String, (StatusCode, String)> {
    let key = sanitize_id(device_id);
    if key.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Device id must contain at least one alphanumeric character".to_string(),
        ));
    }
    Ok(key)
}

fn internal_error(e: tokio::task::JoinError) -> (StatusCode, String) {
    tracing::error!(error = %e, "Device config task failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}
