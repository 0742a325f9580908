//! Channel relay: fan out one inbound frame to every other member of the
//! sender's channel.

use axum::extract::ws::Message;

use super::registry::StreamRegistry;
use super::ConnectionId;

/// Forward a frame to all other connections sharing the sender's device id.
///
/// Delivery is best-effort per recipient: a recipient whose channel is
/// closing is skipped without affecting the remaining members or the
/// sender. The Binary/Text framing of the original message is preserved
/// as-is. Returns the number of successful deliveries.
pub fn relay(
    registry: &StreamRegistry,
    device_id: &str,
    sender_id: ConnectionId,
    message: Message,
) -> usize {
    let members = registry.members_of(device_id, sender_id);
    if members.is_empty() {
        // No peer on this channel: the frame is dropped, not buffered.
        return 0;
    }

    let mut delivered = 0;
    for member in &members {
        match member.send(message.clone()) {
            Ok(()) => delivered += 1,
            Err(_) => {
                // Recipient's writer task has gone away; its own lifecycle
                // handler will unregister it.
                tracing::debug!(
                    device_id = %device_id,
                    "Dropped frame for closing recipient"
                );
            }
        }
    }

    delivered
}
