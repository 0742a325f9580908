use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::state::AppState;
use crate::ws::relay;

/// Run the actor-per-connection pattern for an accepted relay connection.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader loop: relays each inbound frame to the channel's other members
///
/// The mpsc channel is what the registry hands out: any other connection's
/// reader can push frames to this client by cloning the sender.
///
/// Frames are relayed synchronously before the next receive, so each
/// sender's frames reach recipients in the order they were produced. The
/// single cleanup path after the loop unregisters exactly once, whether the
/// connection ended via remote close, stream end, or a transport error.
pub async fn run_connection(socket: WebSocket, state: AppState, device_id: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let connection_id = state.registry.register(&device_id, tx.clone());

    tracing::info!(
        device_id = %device_id,
        connection_id = connection_id,
        peers = state.registry.connection_count(&device_id),
        "Client connected to stream"
    );

    // Spawn writer task: forwards mpsc messages to the WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Binary(_) | Message::Text(_) => {
                    relay::relay(&state.registry, &device_id, connection_id, msg);
                }
                Message::Ping(data) => {
                    // Respond to client pings with pong
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Pong(_) => {}
                Message::Close(frame) => {
                    tracing::info!(
                        device_id = %device_id,
                        connection_id = connection_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    device_id = %device_id,
                    connection_id = connection_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                // Stream ended — client disconnected
                tracing::info!(
                    device_id = %device_id,
                    connection_id = connection_id,
                    "WebSocket stream ended"
                );
                break;
            }
        }
    }

    writer_handle.abort();
    state.registry.unregister(&device_id, connection_id);

    tracing::info!(
        device_id = %device_id,
        connection_id = connection_id,
        active_channels = state.registry.channel_count(),
        "Client disconnected from stream"
    );
}

/// Writer task: receives messages from the mpsc channel and forwards them to
/// the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
