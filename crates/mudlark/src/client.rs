//! WebSocket client for the game socket.
//!
//! [`GameClient::connect`] opens the socket and spawns one session task that
//! owns it for the lifetime of the connection. The task runs a single
//! `select!` loop over outbound commands, the heartbeat ticker, and inbound
//! frames, feeding every decoded frame through the [`SessionState`] reducer.
//! When the socket closes or errors the loop exits, which also stops the
//! heartbeat; there is no automatic reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use mudlark_protocol::{ClientCommand, ServerFrame};

use crate::session::{SessionState, SessionUpdate};

/// Default keepalive interval for the game socket.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection parameters for one session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the game server.
    pub url: String,
    /// Keepalive send interval.
    pub heartbeat_interval: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        ClientConfig {
            url: url.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    /// The session task has ended; no further commands can be sent.
    #[error("session is no longer running")]
    SessionEnded,
}

/// A live connection to the game server.
///
/// Owns the session task. Dropping the client aborts the task and with it
/// the socket and heartbeat.
pub struct GameClient {
    state: Arc<Mutex<SessionState>>,
    cmd_tx: mpsc::UnboundedSender<ClientCommand>,
    updates_tx: mpsc::UnboundedSender<SessionUpdate>,
    task: JoinHandle<()>,
}

impl GameClient {
    /// Open the socket and start the session task. Returns the client handle
    /// plus the receiver of session updates, in the order they are applied.
    pub async fn connect(
        config: ClientConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionUpdate>), ClientError> {
        info!("connecting to game server at {}", config.url);
        let (socket, _) = connect_async(config.url.as_str())
            .await
            .map_err(|source| ClientError::Connect {
                url: config.url.clone(),
                source,
            })?;

        let state = Arc::new(Mutex::new(SessionState::new()));
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();

        {
            let mut session = state.lock().await;
            let _ = updates_tx.send(session.mark_connected());
        }

        let task = tokio::spawn(run_session(
            socket,
            state.clone(),
            cmd_rx,
            updates_tx.clone(),
            config.heartbeat_interval,
        ));

        let client = GameClient {
            state,
            cmd_tx,
            updates_tx,
            task,
        };
        Ok((client, updates_rx))
    }

    /// Submit a player utterance: append the local echo and queue the `act`
    /// frame for transmission.
    pub async fn say(&self, text: &str) -> Result<(), ClientError> {
        let (command, update) = self.state.lock().await.submit_utterance(text);
        let _ = self.updates_tx.send(update);
        self.cmd_tx
            .send(command)
            .map_err(|_| ClientError::SessionEnded)
    }

    /// Shared session state, for snapshots outside the update stream.
    pub fn state(&self) -> Arc<Mutex<SessionState>> {
        self.state.clone()
    }

    /// Tear the session down: stop the task (closing the socket and the
    /// heartbeat with it) and park the session as idle.
    pub async fn disconnect(self) {
        self.task.abort();
        let update = self.state.lock().await.mark_idle();
        let _ = self.updates_tx.send(update);
        info!("session disconnected");
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The session task: one loop, three triggers.
async fn run_session(
    socket: WsStream,
    state: Arc<Mutex<SessionState>>,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientCommand>,
    updates_tx: mpsc::UnboundedSender<SessionUpdate>,
    heartbeat_interval: Duration,
) {
    let (mut sink, mut stream) = socket.split();
    let mut heartbeat = tokio::time::interval(heartbeat_interval);

    loop {
        tokio::select! {
            // Outbound commands from the handle
            Some(command) = cmd_rx.recv() => {
                let json = match serde_json::to_string(&command) {
                    Ok(j) => j,
                    Err(err) => {
                        warn!("failed to serialize command: {err}");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    mark_errored(&state, &updates_tx).await;
                    break;
                }
            }

            // Periodic keepalive
            _ = heartbeat.tick() => {
                let json = match serde_json::to_string(&ClientCommand::heartbeat()) {
                    Ok(j) => j,
                    Err(err) => {
                        warn!("failed to serialize heartbeat: {err}");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    mark_errored(&state, &updates_tx).await;
                    break;
                }
            }

            // Inbound server frames
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        match ServerFrame::parse(text.as_str()) {
                            Ok(frame) => {
                                let updates = state.lock().await.apply_frame(frame);
                                for update in updates {
                                    let _ = updates_tx.send(update);
                                }
                            }
                            // Malformed frames are dropped, never fatal.
                            Err(err) => warn!("dropping malformed frame: {err}"),
                        }
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                        debug!("keepalive frame from server");
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("server closed the connection");
                        mark_errored(&state, &updates_tx).await;
                        break;
                    }
                    Some(Ok(_)) => {
                        debug!("ignoring non-text frame");
                    }
                    Some(Err(err)) => {
                        warn!("socket error: {err}");
                        mark_errored(&state, &updates_tx).await;
                        break;
                    }
                }
            }
        }
    }
}

async fn mark_errored(
    state: &Arc<Mutex<SessionState>>,
    updates_tx: &mpsc::UnboundedSender<SessionUpdate>,
) {
    let update = state.lock().await.mark_errored();
    let _ = updates_tx.send(update);
}
