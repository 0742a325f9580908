use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::state::AppState;
use crate::ws::actor;

/// Query parameters for a relay connection.
/// Clients identify their channel via the device id query param:
/// ws://server/ws?id=24:6F:28:A1:B2:C3
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub id: Option<String>,
}

/// GET /ws?id=<device-id>
/// WebSocket relay endpoint. The device id is extracted exactly once, before
/// any message is processed. A missing or empty id rejects the connection:
/// the socket is upgraded and then immediately closed, with no registry entry.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<StreamQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match params.id.filter(|id| !id.is_empty()) {
        Some(device_id) => {
            ws.on_upgrade(move |socket| actor::run_connection(socket, state, device_id))
        }
        None => {
            tracing::warn!("Client rejected: no device id provided");
            ws.on_upgrade(reject_connection)
        }
    }
}

/// Close a keyless connection without any handshake-level error payload.
async fn reject_connection(mut socket: WebSocket) {
    let _ = socket.send(Message::Close(None)).await;
}
