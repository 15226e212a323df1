//! Message routing: validate, timestamp, persist, forward.
//!
//! Timestamp assignment and persistence for one conversation run inside a
//! per-conversation critical section, so `created_at` is strictly increasing
//! in persisted order and receivers observe messages in that same order.
//! Unrelated conversations never contend on a shared lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use tutoria_shared::constants::MAX_BODY_BYTES;
use tutoria_shared::protocol::{SendMessage, ServerEvent};
use tutoria_shared::types::{ConversationId, Message, UserId};

use crate::error::ServerError;
use crate::history::HistoryStore;
use crate::presence::PresenceRegistry;

/// Per-conversation timestamp state, seeded from persisted history the first
/// time the conversation is routed after a restart.
#[derive(Debug, Default)]
struct ConversationClock {
    seeded: bool,
    last: Option<DateTime<Utc>>,
}

pub struct MessageRouter {
    history: HistoryStore,
    presence: Arc<PresenceRegistry>,
    clocks: Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<ConversationClock>>>>,
}

impl MessageRouter {
    pub fn new(history: HistoryStore, presence: Arc<PresenceRegistry>) -> Self {
        Self {
            history,
            presence,
            clocks: Mutex::new(HashMap::new()),
        }
    }

    /// Route one message from the connection bound to `bound_identity`.
    ///
    /// Validation failures return [`ServerError::InvalidMessage`] and perform
    /// no side effect.  On success the message is persisted and, if the
    /// receiver has a live connection, forwarded to it.  An offline receiver
    /// gets nothing live; the message waits in history for the next
    /// initialize.  The sender is never echoed to (clients display
    /// optimistically).
    pub async fn send(
        &self,
        bound_identity: &UserId,
        payload: SendMessage,
    ) -> Result<Message, ServerError> {
        if payload.sender_id != *bound_identity {
            return Err(ServerError::InvalidMessage(
                "sender does not match the registered identity".to_owned(),
            ));
        }

        let body = payload.body.trim();
        if body.is_empty() {
            return Err(ServerError::InvalidMessage(
                "message body is empty".to_owned(),
            ));
        }
        if body.len() > MAX_BODY_BYTES {
            return Err(ServerError::InvalidMessage(format!(
                "message body exceeds {MAX_BODY_BYTES} bytes"
            )));
        }

        // The conversation must exist and contain both sender and receiver.
        let conversation = match self.history.get_conversation(payload.conversation_id).await {
            Ok(conversation) => conversation,
            Err(ServerError::NotFound(_)) => {
                return Err(ServerError::InvalidMessage(
                    "unknown conversation".to_owned(),
                ));
            }
            Err(other) => return Err(other),
        };
        if payload.sender_id == payload.receiver_id
            || !conversation.contains(&payload.sender_id)
            || !conversation.contains(&payload.receiver_id)
        {
            return Err(ServerError::InvalidMessage(
                "conversation does not match the sender/receiver pair".to_owned(),
            ));
        }

        // Per-conversation critical section: timestamp, persist, forward.
        let clock = self.clock_for(payload.conversation_id);
        let mut clock = clock.lock().await;

        if !clock.seeded {
            clock.last = self.history.last_created_at(payload.conversation_id).await?;
            clock.seeded = true;
        }

        let now = Utc::now();
        let created_at = match clock.last {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        clock.last = Some(created_at);

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: payload.conversation_id,
            sender_id: payload.sender_id,
            receiver_id: payload.receiver_id,
            body: body.to_owned(),
            created_at,
        };

        self.history.insert_message(message.clone()).await?;

        match self.presence.lookup(&message.receiver_id) {
            Some(handle) => {
                handle.deliver(ServerEvent::Message(message.clone()));
                debug!(
                    message = %message.id,
                    conversation = %message.conversation_id,
                    receiver = %message.receiver_id,
                    "message forwarded"
                );
            }
            None => {
                debug!(
                    message = %message.id,
                    receiver = %message.receiver_id,
                    "receiver offline; message persisted only"
                );
            }
        }

        Ok(message)
    }

    fn clock_for(&self, id: ConversationId) -> Arc<tokio::sync::Mutex<ConversationClock>> {
        let mut clocks = self
            .clocks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        clocks.entry(id).or_default().clone()
    }
}
