//! Per-device configuration records.
//!
//! Each device has a small JSON record at `{data_dir}/devices/{key}.json`
//! where `key` is the device id reduced to alphanumeric characters. Records
//! are created on first read with default values and merged field-by-field
//! on update. Last write wins; there is no versioning.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Whether the device should be streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSwitch {
    On,
    Off,
}

/// Persisted per-device camera settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub stream: StreamSwitch,
    pub frame_size: String,
    pub fps: u32,
    pub quality: u32,
    pub rotation: i32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            stream: StreamSwitch::Off,
            frame_size: "QVGA".to_string(),
            fps: 10,
            quality: 12,
            rotation: 0,
        }
    }
}

/// Partial update: any subset of fields; unspecified fields keep their
/// prior values.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfigUpdate {
    pub stream: Option<StreamSwitch>,
    pub frame_size: Option<String>,
    pub fps: Option<u32>,
    pub quality: Option<u32>,
    pub rotation: Option<i32>,
}

impl DeviceConfig {
    /// Merge a partial update over this record.
    pub fn apply(&mut self, update: DeviceConfigUpdate) {
        if let Some(stream) = update.stream {
            self.stream = stream;
        }
        if let Some(frame_size) = update.frame_size {
            self.frame_size = frame_size;
        }
        if let Some(fps) = update.fps {
            self.fps = fps;
        }
        if let Some(quality) = update.quality {
            self.quality = quality;
        }
        if let Some(rotation) = update.rotation {
            self.rotation = rotation;
        }
    }
}

/// Reduce a device id to its storage key: alphanumeric characters only.
/// `24:6F:28:A1:B2:C3` becomes `246F28A1B2C3`.
pub fn sanitize_id(device_id: &str) -> String {
    device_id.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// File-backed store of device config records. All I/O is synchronous;
/// handlers call it through `spawn_blocking`.
pub struct DeviceStore {
    data_dir: String,
}

impl DeviceStore {
    pub fn new(data_dir: &str) -> Self {
        Self {
            data_dir: data_dir.to_string(),
        }
    }

    fn devices_dir(&self) -> PathBuf {
        Path::new(&self.data_dir).join("devices")
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.devices_dir().join(format!("{}.json", key))
    }

    /// Return the stored record for a (pre-sanitized) key, creating and
    /// persisting the default record when none exists. I/O or parse
    /// failures fall back to an in-memory default rather than surfacing an
    /// error to the caller.
    pub fn read_or_create(&self, key: &str) -> DeviceConfig {
        let path = self.record_path(key);

        if path.exists() {
            match self.load(&path) {
                Some(config) => config,
                None => DeviceConfig::default(),
            }
        } else {
            let config = DeviceConfig::default();
            self.persist(key, &config);
            config
        }
    }

    /// Merge a partial update over the current record and persist the
    /// result. Returns the merged record.
    pub fn update(&self, key: &str, update: DeviceConfigUpdate) -> DeviceConfig {
        let mut config = self.read_or_create(key);
        config.apply(update);
        self.persist(key, &config);
        config
    }

    fn load(&self, path: &Path) -> Option<DeviceConfig> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read device config, using defaults"
                );
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse device config, using defaults"
                );
                None
            }
        }
    }

    fn persist(&self, key: &str, config: &DeviceConfig) {
        let dir = self.devices_dir();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!(
                path = %dir.display(),
                error = %e,
                "Failed to create devices directory"
            );
            return;
        }

        let path = self.record_path(key);
        let json = match serde_json::to_string_pretty(config) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize device config");
                return;
            }
        };

        if let Err(e) = std::fs::write(&path, json) {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to write device config"
            );
        }
    }
}
