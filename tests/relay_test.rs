//! Integration tests for the WebSocket relay: channel grouping, fan-out,
//! echo suppression, and rejection of keyless connections.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Start the server on a random port and return its address.
async fn start_test_server() -> SocketAddr {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let state = camrelay_server::state::AppState::new(&data_dir);
    let app = camrelay_server::routes::build_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
        let _keep = tmp_dir;
    });

    addr
}

/// Connect a relay client for the given device id.
async fn connect(addr: SocketAddr, device_id: &str) -> WsStream {
    let url = format!("ws://{}/ws?id={}", addr, device_id);
    let (stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("Failed to connect to relay");
    stream
}

/// Give the server a moment to run the upgrade tasks and register clients.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

/// Expect no incoming data frame within a short window.
async fn assert_silent(stream: &mut WsStream) {
    match tokio::time::timeout(Duration::from_millis(300), stream.next()).await {
        Err(_) => {} // timeout: nothing received
        Ok(msg) => panic!("Expected no message, got: {:?}", msg),
    }
}

#[tokio::test]
async fn test_binary_frame_relayed_to_same_device_peer() {
    let addr = start_test_server().await;

    let mut a = connect(addr, "dev1").await;
    let mut b = connect(addr, "dev1").await;
    settle().await;

    a.send(Message::Binary(vec![0x01, 0x02, 0x03].into()))
        .await
        .expect("Failed to send frame");

    let msg = tokio::time::timeout(Duration::from_secs(2), b.next())
        .await
        .expect("Expected relayed frame within timeout")
        .expect("Stream ended")
        .expect("WebSocket error");

    match msg {
        Message::Binary(data) => assert_eq!(data.as_ref(), &[0x01, 0x02, 0x03]),
        other => panic!("Expected binary frame, got: {:?}", other),
    }

    // Echo suppression: the sender never receives its own frame.
    assert_silent(&mut a).await;

    // B disconnects; a further send by A is silently dropped, no error.
    b.send(Message::Close(None)).await.expect("Failed to close");
    settle().await;

    a.send(Message::Binary(vec![0x04].into()))
        .await
        .expect("Send after peer disconnect should not error");
    assert_silent(&mut a).await;
}

#[tokio::test]
async fn test_text_frame_preserves_framing() {
    let addr = start_test_server().await;

    let mut a = connect(addr, "dev1").await;
    let mut b = connect(addr, "dev1").await;
    settle().await;

    a.send(Message::Text("status:ok".into()))
        .await
        .expect("Failed to send text frame");

    let msg = tokio::time::timeout(Duration::from_secs(2), b.next())
        .await
        .expect("Expected relayed frame within timeout")
        .expect("Stream ended")
        .expect("WebSocket error");

    match msg {
        Message::Text(text) => assert_eq!(text.as_str(), "status:ok"),
        other => panic!("Expected text frame, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_no_delivery_across_device_ids() {
    let addr = start_test_server().await;

    let mut a = connect(addr, "dev1").await;
    let mut b = connect(addr, "dev2").await;
    settle().await;

    a.send(Message::Binary(vec![0xAA].into()))
        .await
        .expect("Failed to send frame");

    assert_silent(&mut b).await;
}

#[tokio::test]
async fn test_fanout_reaches_all_other_members() {
    let addr = start_test_server().await;

    let mut sender = connect(addr, "cam7").await;
    let mut viewers = Vec::new();
    for _ in 0..3 {
        viewers.push(connect(addr, "cam7").await);
    }
    settle().await;

    sender
        .send(Message::Binary(vec![0xDE, 0xAD].into()))
        .await
        .expect("Failed to send frame");

    for viewer in &mut viewers {
        let msg = tokio::time::timeout(Duration::from_secs(2), viewer.next())
            .await
            .expect("Expected relayed frame within timeout")
            .expect("Stream ended")
            .expect("WebSocket error");
        match msg {
            Message::Binary(data) => assert_eq!(data.as_ref(), &[0xDE, 0xAD]),
            other => panic!("Expected binary frame, got: {:?}", other),
        }
    }

    assert_silent(&mut sender).await;
}

#[tokio::test]
async fn test_missing_device_id_is_rejected() {
    let addr = start_test_server().await;

    let url = format!("ws://{}/ws", addr);
    let (mut stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("WebSocket should upgrade even without a device id");

    // Server closes immediately with no registry entry.
    let msg = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("Expected close within timeout");

    match msg {
        Some(Ok(Message::Close(_))) | None => {}
        other => panic!("Expected close, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_device_id_is_rejected() {
    let addr = start_test_server().await;

    let url = format!("ws://{}/ws?id=", addr);
    let (mut stream, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("WebSocket should upgrade even with an empty device id");

    let msg = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("Expected close within timeout");

    match msg {
        Some(Ok(Message::Close(_))) | None => {}
        other => panic!("Expected close, got: {:?}", other),
    }

    // A rejected connection must never appear in any channel: a valid pair
    // on some key still sees only each other.
    let mut a = connect(addr, "dev1").await;
    let mut b = connect(addr, "dev1").await;
    settle().await;

    a.send(Message::Binary(vec![0x01].into()))
        .await
        .expect("Failed to send frame");

    let msg = tokio::time::timeout(Duration::from_secs(2), b.next())
        .await
        .expect("Expected relayed frame within timeout")
        .expect("Stream ended")
        .expect("WebSocket error");
    assert!(matches!(msg, Message::Binary(data) if data.as_ref() == [0x01]));
}

#[tokio::test]
async fn test_disconnect_cleanup_allows_reconnect() {
    let addr = start_test_server().await;

    {
        let mut first = connect(addr, "dev1").await;
        first
            .send(Message::Close(None))
            .await
            .expect("Failed to send close");
    }
    settle().await;

    // Reconnect under the same id and verify relaying still works.
    let mut a = connect(addr, "dev1").await;
    let mut b = connect(addr, "dev1").await;
    settle().await;

    a.send(Message::Binary(vec![0x09].into()))
        .await
        .expect("Failed to send frame");

    let msg = tokio::time::timeout(Duration::from_secs(2), b.next())
        .await
        .expect("Expected relayed frame within timeout")
        .expect("Stream ended")
        .expect("WebSocket error");
    assert!(matches!(msg, Message::Binary(data) if data.as_ref() == [0x09]));
}

#[tokio::test]
async fn test_ping_answered_with_pong() {
    let addr = start_test_server().await;

    let mut a = connect(addr, "dev1").await;
    settle().await;

    a.send(Message::Ping(vec![42, 43].into()))
        .await
        .expect("Failed to send ping");

    let msg = tokio::time::timeout(Duration::from_secs(2), a.next())
        .await
        .expect("Expected pong within timeout")
        .expect("Stream ended")
        .expect("WebSocket error");

    match msg {
        Message::Pong(data) => assert_eq!(data.as_ref(), &[42, 43]),
        other => panic!("Expected pong, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_status_and_health_endpoints() {
    let addr = start_test_server().await;
    let client = reqwest::Client::new();

    let body = client
        .get(format!("http://{}/", addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ESP32-CAM Multi-Stream WebSocket Relay Running.");

    let body = client
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");
}
