use std::sync::Arc;

use crate::device::store::DeviceStore;
use crate::ws::registry::StreamRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Live relay connections grouped by device id
    pub registry: Arc<StreamRegistry>,
    /// File-backed per-device config records
    pub devices: Arc<DeviceStore>,
}

impl AppState {
    pub fn new(data_dir: &str) -> Self {
        Self {
            registry: Arc::new(StreamRegistry::new()),
            devices: Arc::new(DeviceStore::new(data_dir)),
        }
    }
}
