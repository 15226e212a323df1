//! Persistent connection session with tokio mpsc command/notification pattern.
//!
//! The session event loop runs in a dedicated tokio task that owns the
//! WebSocket.  External code communicates with it through typed command and
//! notification channels, so the UI layer never touches the transport.
//!
//! The loop registers the configured identity immediately after every
//! (re)connect and retries lost connections with bounded exponential backoff.
//! A `Close` command wins over a pending retry.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use tutoria_shared::constants::{CONNECT_TIMEOUT_MS, SESSION_CHANNEL_CAPACITY};
use tutoria_shared::protocol::{ClientEvent, SendMessage, ServerEvent};
use tutoria_shared::types::{Message, UserId};

use crate::error::ClientError;
use crate::reconnect::ReconnectPolicy;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Command / notification types
// ---------------------------------------------------------------------------

/// Commands sent *into* the session task.
#[derive(Debug)]
pub enum SessionCommand {
    /// Hand a message to the server's router.
    Send(SendMessage),
    /// Gracefully shut the session down.
    Close,
}

/// Notifications sent *from* the session task to the application.
#[derive(Debug, Clone)]
pub enum SessionNotification {
    /// Connection established and identity registered.
    Connected,
    /// A message addressed to this identity arrived.
    Message(Message),
    /// The server reported a failure on this connection.
    ConnectionError { reason: String },
    /// The connection dropped.  `will_retry` says whether the session keeps
    /// trying; when `false` the task is about to terminate.
    Disconnected { will_retry: bool },
    /// Every retry failed; the session task has terminated.
    RetriesExhausted,
}

/// Configuration for spawning a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Full WebSocket endpoint, e.g. `ws://127.0.0.1:8080/ws`.
    pub ws_url: String,
    /// Identity to bind the connection to.
    pub user_id: UserId,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout: Duration,
}

impl SessionConfig {
    pub fn new(ws_url: impl Into<String>, user_id: UserId) -> Self {
        Self {
            ws_url: ws_url.into(),
            user_id,
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_millis(CONNECT_TIMEOUT_MS),
        }
    }
}

/// Spawn the session event loop in a background tokio task.
///
/// Returns channels for sending commands and receiving notifications.  The
/// task terminates on `Close`, when the command sender is dropped, or when
/// the retry budget is exhausted.
pub fn spawn_session(
    config: SessionConfig,
) -> (
    mpsc::Sender<SessionCommand>,
    mpsc::Receiver<SessionNotification>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
    let (notif_tx, notif_rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        session_loop(config, cmd_rx, notif_tx).await;
    });

    (cmd_tx, notif_rx)
}

enum LoopEnd {
    CloseRequested,
    ConnectionLost,
}

async fn session_loop(
    config: SessionConfig,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    notif_tx: mpsc::Sender<SessionNotification>,
) {
    let mut attempt: u32 = 0;

    loop {
        match connect_and_register(&config).await {
            Ok(mut socket) => {
                attempt = 0;
                info!(user = %config.user_id, url = %config.ws_url, "session connected");
                let _ = notif_tx.send(SessionNotification::Connected).await;

                match drive(&mut socket, &mut cmd_rx, &notif_tx).await {
                    LoopEnd::CloseRequested => {
                        let _ = socket.close(None).await;
                        let _ = notif_tx
                            .send(SessionNotification::Disconnected { will_retry: false })
                            .await;
                        debug!(user = %config.user_id, "session closed");
                        return;
                    }
                    LoopEnd::ConnectionLost => {}
                }
            }
            Err(e) => {
                warn!(url = %config.ws_url, error = %e, "connect attempt failed");
            }
        }

        attempt += 1;
        if attempt > config.reconnect.max_attempts {
            warn!(
                user = %config.user_id,
                attempts = config.reconnect.max_attempts,
                "giving up on reconnecting"
            );
            let _ = notif_tx.send(SessionNotification::RetriesExhausted).await;
            return;
        }

        let _ = notif_tx
            .send(SessionNotification::Disconnected { will_retry: true })
            .await;

        let delay = config.reconnect.delay_for(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");

        // A close command during backoff cancels the retry.
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            cmd = cmd_rx.recv() => match cmd {
                Some(SessionCommand::Close) | None => return,
                Some(SessionCommand::Send(_)) => {
                    let _ = notif_tx
                        .send(SessionNotification::ConnectionError {
                            reason: "not connected".to_owned(),
                        })
                        .await;
                }
            },
        }
    }
}

/// Open the socket and bind it to the configured identity.
async fn connect_and_register(config: &SessionConfig) -> Result<WsStream, ClientError> {
    let connect = connect_async(config.ws_url.as_str());
    let (mut socket, _response) = tokio::time::timeout(config.connect_timeout, connect)
        .await
        .map_err(|_| ClientError::Connect("connect timed out".to_owned()))??;

    let register = ClientEvent::RegisterIdentity {
        user_id: config.user_id.clone(),
    };
    socket.send(WsMessage::Text(register.to_json()?)).await?;

    Ok(socket)
}

/// Pump commands out and server events in until the connection ends.
async fn drive(
    socket: &mut WsStream,
    cmd_rx: &mut mpsc::Receiver<SessionCommand>,
    notif_tx: &mpsc::Sender<SessionNotification>,
) -> LoopEnd {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(SessionCommand::Send(payload)) => {
                    let event = ClientEvent::SendMessage(payload);
                    let json = match event.to_json() {
                        Ok(json) => json,
                        Err(e) => {
                            error!(error = %e, "failed to serialize outgoing event");
                            continue;
                        }
                    };
                    if socket.send(WsMessage::Text(json)).await.is_err() {
                        return LoopEnd::ConnectionLost;
                    }
                }
                Some(SessionCommand::Close) | None => return LoopEnd::CloseRequested,
            },

            frame = socket.next() => {
                let message = match frame {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        debug!(error = %e, "transport error");
                        return LoopEnd::ConnectionLost;
                    }
                    None => return LoopEnd::ConnectionLost,
                };

                match message {
                    WsMessage::Text(text) => dispatch(&text, notif_tx).await,
                    WsMessage::Close(_) => return LoopEnd::ConnectionLost,
                    // Ping/pong are handled by the transport.
                    _ => {}
                }
            }
        }
    }
}

async fn dispatch(text: &str, notif_tx: &mpsc::Sender<SessionNotification>) {
    match ServerEvent::from_json(text) {
        Ok(ServerEvent::Message(message)) => {
            let _ = notif_tx.send(SessionNotification::Message(message)).await;
        }
        Ok(ServerEvent::ConnectionError { reason }) => {
            warn!(reason = %reason, "server reported connection error");
            let _ = notif_tx
                .send(SessionNotification::ConnectionError { reason })
                .await;
        }
        Err(e) => {
            debug!(error = %e, "ignoring malformed server frame");
        }
    }
}
