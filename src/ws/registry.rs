//! Connection registry: the shared structure mapping live connections to
//! their device id (channel key).
//!
//! This is the only shared mutable state in the relay. Each streaming
//! connection registers under the device id extracted from its upgrade
//! request; fan-out asks the registry for a snapshot of the other members
//! of the same channel.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::{ConnectionId, ConnectionSender};

/// A registered connection: explicit association of a connection identity
/// with its sender handle. The device id is the map key and is assigned
/// exactly once, at registration.
struct RegisteredConnection {
    id: ConnectionId,
    sender: ConnectionSender,
}

/// Tracks all active relay connections per device id.
/// A device id can have any number of concurrent connections (the camera
/// plus any number of viewers).
pub struct StreamRegistry {
    channels: DashMap<String, Vec<RegisteredConnection>>,
    next_id: AtomicU64,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connection under a device id and assign it a unique id.
    /// Callers must only register connections with a non-empty device id;
    /// the upgrade handler rejects keyless connections before this point.
    pub fn register(&self, device_id: &str, sender: ConnectionSender) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.channels
            .entry(device_id.to_string())
            .or_default()
            .push(RegisteredConnection { id, sender });

        tracing::debug!(
            device_id = %device_id,
            connection_id = id,
            "Connection registered"
        );
        id
    }

    /// Remove a connection from its channel. Idempotent: unregistering an
    /// unknown or already-removed connection is a no-op. The channel's
    /// bucket is dropped once its last member leaves; the emptiness check
    /// runs under the shard lock, so a registration racing this call can
    /// never be swept away with the bucket.
    pub fn unregister(&self, device_id: &str, id: ConnectionId) {
        if let Some(mut members) = self.channels.get_mut(device_id) {
            members.retain(|conn| conn.id != id);
        }
        self.channels
            .remove_if(device_id, |_, members| members.is_empty());

        tracing::debug!(
            device_id = %device_id,
            connection_id = id,
            "Connection unregistered"
        );
    }

    /// Snapshot of all other members of a channel, excluding the sender.
    /// Senders are cloned out under the shard lock so callers never iterate
    /// a structure that is being concurrently mutated.
    pub fn members_of(&self, device_id: &str, exclude: ConnectionId) -> Vec<ConnectionSender> {
        match self.channels.get(device_id) {
            Some(members) => members
                .iter()
                .filter(|conn| conn.id != exclude)
                .map(|conn| conn.sender.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of live connections on one channel.
    pub fn connection_count(&self, device_id: &str) -> usize {
        self.channels.get(device_id).map(|m| m.len()).unwrap_or(0)
    }

    /// Number of channels with at least one live connection.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for StreamRegistry {
    fn default() -> Self {
        Self::new()
    }
}
