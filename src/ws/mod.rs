pub mod actor;
pub mod handler;
pub mod registry;
pub mod relay;

use tokio::sync::mpsc;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Unique identity assigned to a connection at registration time.
pub type ConnectionId = u64;
