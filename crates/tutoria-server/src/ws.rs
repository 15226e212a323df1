//! WebSocket endpoint: the server half of every connection session.
//!
//! Each upgraded socket gets its own task and a bounded outbox pumped by a
//! companion task; the presence registry hands the outbox sender to the
//! router for live forwarding.  A connection starts unregistered and may not
//! send until it has emitted `register-identity`.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use tutoria_shared::constants::OUTBOX_CAPACITY;
use tutoria_shared::protocol::{ClientEvent, ServerEvent};
use tutoria_shared::types::UserId;

use crate::api::AppState;
use crate::error::ServerError;
use crate::presence::ConnectionHandle;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let (outbox_tx, mut outbox_rx) = mpsc::channel::<ServerEvent>(OUTBOX_CAPACITY);
    let handle = ConnectionHandle::new(outbox_tx);
    let connection_id = handle.connection_id();

    debug!(connection = %connection_id, "connection established");

    // Pump queued server events out to the socket.
    let pump = tokio::spawn(async move {
        while let Some(event) = outbox_rx.recv().await {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "failed to serialize server event");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Identity bound to this connection, if any.  Set by `register-identity`.
    let mut registered: Option<UserId> = None;

    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                debug!(connection = %connection_id, error = %e, "transport error");
                break;
            }
        };

        let text = match message {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            // Ping/pong are answered by axum; binary frames are not part of
            // the protocol.
            _ => continue,
        };

        let event = match ClientEvent::from_json(text.as_str()) {
            Ok(event) => event,
            Err(e) => {
                debug!(connection = %connection_id, error = %e, "ignoring malformed frame");
                continue;
            }
        };

        match event {
            ClientEvent::RegisterIdentity { user_id } => {
                handle_register(&state, &handle, &mut registered, user_id).await;
            }

            ClientEvent::SendMessage(payload) => {
                let Some(user_id) = registered.as_ref() else {
                    warn!(
                        connection = %connection_id,
                        "send-message before register-identity; dropping"
                    );
                    continue;
                };

                match state.router.send(user_id, payload).await {
                    Ok(message) => {
                        debug!(message = %message.id, "message routed");
                    }
                    // Rejected silently towards the offender; log only.
                    Err(ServerError::InvalidMessage(reason)) => {
                        warn!(user = %user_id, reason = %reason, "rejected message");
                    }
                    Err(e) => {
                        error!(user = %user_id, error = %e, "message send failed");
                        handle.deliver(ServerEvent::ConnectionError {
                            reason: "message could not be stored".to_owned(),
                        });
                    }
                }
            }
        }
    }

    // A stale disconnect must not evict a newer registration; unregister is
    // guarded by our connection id.
    if let Some(user_id) = registered {
        if state.presence.unregister(&user_id, connection_id) {
            info!(user = %user_id, connection = %connection_id, "user went offline");
        }
    }

    pump.abort();
    debug!(connection = %connection_id, "connection closed");
}

async fn handle_register(
    state: &AppState,
    handle: &ConnectionHandle,
    registered: &mut Option<UserId>,
    user_id: UserId,
) {
    match state.history.get_user(&user_id).await {
        Ok(_) => {
            // Re-registering a different identity releases the old binding.
            if let Some(old) = registered.take() {
                if old != user_id {
                    state.presence.unregister(&old, handle.connection_id());
                }
            }
            if let Some(previous) = state.presence.register(user_id.clone(), handle.clone()) {
                // The superseded socket stays open but is no longer
                // addressable; its owner closes it on natural reconnect.
                debug!(
                    user = %user_id,
                    superseded = %previous.connection_id(),
                    "presence entry superseded"
                );
            }
            info!(
                user = %user_id,
                connection = %handle.connection_id(),
                "identity registered"
            );
            *registered = Some(user_id);
        }
        Err(ServerError::NotFound(_)) => {
            warn!(user = %user_id, "rejecting unknown identity");
            handle.deliver(ServerEvent::ConnectionError {
                reason: "unknown identity".to_owned(),
            });
        }
        Err(e) => {
            error!(user = %user_id, error = %e, "identity check failed");
            handle.deliver(ServerEvent::ConnectionError {
                reason: "history store unavailable".to_owned(),
            });
        }
    }
}
