//! Integration tests for the game socket client, against a local
//! WebSocket server.

use std::time::Duration;

use futures::{Future, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use mudlark::client::{ClientConfig, GameClient};
use mudlark::session::{ConnectionState, SessionUpdate};

const WAIT: Duration = Duration::from_secs(5);

/// Start a one-connection WebSocket server and hand the accepted stream to
/// the given handler. Returns the ws:// url to connect to.
async fn ws_server<F, Fut>(handler: F) -> String
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((stream, _)) = listener.accept().await {
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            handler(ws).await;
        }
    });
    format!("ws://{addr}")
}

fn config(url: String) -> ClientConfig {
    let mut config = ClientConfig::new(url);
    config.heartbeat_interval = Duration::from_millis(50);
    config
}

/// Drain updates until one matches, failing on timeout.
async fn wait_for<F>(updates: &mut mpsc::UnboundedReceiver<SessionUpdate>, mut pred: F) -> SessionUpdate
where
    F: FnMut(&SessionUpdate) -> bool,
{
    loop {
        let update = timeout(WAIT, updates.recv())
            .await
            .expect("timed out waiting for update")
            .expect("update stream ended");
        if pred(&update) {
            return update;
        }
    }
}

#[tokio::test]
async fn test_connect_then_receive_actions() {
    let url = ws_server(|mut ws| async move {
        let frame = r#"{"command": "actions", "data": [
            {"caller": "SpeechEvent", "text": "welcome, traveler", "event_id": "e1"}
        ]}"#;
        ws.send(Message::Text(frame.into())).await.unwrap();
        // Keep the connection open until the client goes away.
        while ws.next().await.is_some() {}
    })
    .await;

    let (client, mut updates) = GameClient::connect(config(url)).await.unwrap();

    let first = wait_for(&mut updates, |u| matches!(u, SessionUpdate::Status(_))).await;
    assert_eq!(first, SessionUpdate::Status(ConnectionState::Connected));

    let update = wait_for(&mut updates, |u| matches!(u, SessionUpdate::Message(_))).await;
    match update {
        SessionUpdate::Message(message) => {
            assert_eq!(message.text, "welcome, traveler");
            assert_eq!(message.id, "e1");
        }
        other => panic!("expected Message, got {other:?}"),
    }

    let state = client.state();
    assert!(state.lock().await.is_connected());
    client.disconnect().await;
}

#[tokio::test]
async fn test_say_sends_one_act_frame_with_event_id() {
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<serde_json::Value>();
    let url = ws_server(move |mut ws| async move {
        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            if frame_tx.send(value).is_err() {
                break;
            }
        }
    })
    .await;

    let (client, _updates) = GameClient::connect(config(url)).await.unwrap();
    client.say("hello").await.unwrap();

    // Skip heartbeat frames; the first act frame is ours.
    let frame = loop {
        let frame = timeout(WAIT, frame_rx.recv()).await.unwrap().unwrap();
        if frame["command"] != "hb" {
            break frame;
        }
    };
    assert_eq!(frame["command"], "act");
    assert_eq!(frame["data"]["text"], "hello");
    assert!(frame["data"]["event_id"].as_str().is_some_and(|id| !id.is_empty()));

    // The local echo is already in the log, before any server response.
    let state = client.state();
    let session = state.lock().await;
    assert_eq!(session.message_count(), 1);
    assert!(session.messages().next().unwrap().is_self);
}

#[tokio::test]
async fn test_heartbeats_flow_then_stop_after_server_close() {
    let (hb_tx, mut hb_rx) = mpsc::unbounded_channel::<()>();
    let url = ws_server(move |mut ws| async move {
        let mut seen = 0u32;
        while let Some(Ok(Message::Text(text))) = ws.next().await {
            let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            if value["command"] == "hb" {
                let _ = hb_tx.send(());
                seen += 1;
                if seen >= 2 {
                    // Close the connection out from under the client.
                    let _ = ws.close(None).await;
                    break;
                }
            }
        }
    })
    .await;

    let (client, mut updates) = GameClient::connect(config(url)).await.unwrap();

    timeout(WAIT, hb_rx.recv()).await.unwrap().unwrap();
    timeout(WAIT, hb_rx.recv()).await.unwrap().unwrap();

    let update = wait_for(&mut updates, |u| {
        matches!(u, SessionUpdate::Status(ConnectionState::Errored))
    })
    .await;
    assert_eq!(update, SessionUpdate::Status(ConnectionState::Errored));

    let state = client.state();
    {
        let session = state.lock().await;
        assert!(!session.is_connected());
        assert!(session.is_errored());
    }

    // The session loop has exited, taking the heartbeat ticker with it;
    // once the task is gone, commands have nowhere to go.
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        if client.say("anyone there?").await.is_err() {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "session task never ended");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(hb_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_fail_find_surfaces_world_full() {
    let url = ws_server(|mut ws| async move {
        ws.send(Message::Text(r#"{"command": "fail_find"}"#.into()))
            .await
            .unwrap();
        while ws.next().await.is_some() {}
    })
    .await;

    let (client, mut updates) = GameClient::connect(config(url)).await.unwrap();
    wait_for(&mut updates, |u| {
        matches!(u, SessionUpdate::Status(ConnectionState::WorldFull))
    })
    .await;

    let state = client.state();
    let session = state.lock().await;
    assert!(session.is_world_full());
    assert_eq!(session.message_count(), 0);
}

#[tokio::test]
async fn test_malformed_frame_does_not_kill_the_session() {
    let url = ws_server(|mut ws| async move {
        ws.send(Message::Text("{not json".into())).await.unwrap();
        ws.send(Message::Text(
            r#"{"command": "actions", "data": [
                {"caller": "SpeechEvent", "text": "still here", "event_id": "e2"}
            ]}"#
            .into(),
        ))
        .await
        .unwrap();
        while ws.next().await.is_some() {}
    })
    .await;

    let (client, mut updates) = GameClient::connect(config(url)).await.unwrap();
    let update = wait_for(&mut updates, |u| matches!(u, SessionUpdate::Message(_))).await;
    match update {
        SessionUpdate::Message(message) => assert_eq!(message.text, "still here"),
        other => panic!("expected Message, got {other:?}"),
    }

    let state = client.state();
    assert!(state.lock().await.is_connected());
}
