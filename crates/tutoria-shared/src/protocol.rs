//! JSON wire protocol for the persistent connection, plus the REST contracts
//! consumed around it.
//!
//! Events travel as text frames shaped `{"event": "...", "data": {...}}`.
//! The event names are part of the external interface and must not change.

use serde::{Deserialize, Serialize};

use crate::types::{Contact, ConversationId, Message, UserId};

// ---------------------------------------------------------------------------
// Persistent-connection events
// ---------------------------------------------------------------------------

/// Events a client sends over its persistent connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Binds the connection to an identity and enters the presence registry.
    RegisterIdentity { user_id: UserId },
    /// Hands a message to the router.
    SendMessage(SendMessage),
}

/// Payload of a `send-message` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub conversation_id: ConversationId,
    pub body: String,
}

/// Events the server pushes to a connected client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A message addressed to this connection's identity.
    Message(Message),
    /// Transport- or store-level failure notice.
    ConnectionError { reason: String },
}

impl ClientEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

// ---------------------------------------------------------------------------
// REST contracts
// ---------------------------------------------------------------------------

/// `POST /conversations/initialize` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeRequest {
    pub user_id: UserId,
    pub partner_id: UserId,
}

/// `POST /conversations/initialize` response: the stable conversation id for
/// the pair plus its full ordered history (empty for a fresh conversation).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeResponse {
    pub conversation_id: ConversationId,
    pub messages: Vec<Message>,
}

/// `GET /contacts/{user_id}` response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactsResponse {
    pub contacts: Vec<Contact>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConversationPair;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn client_event_round_trip() {
        let event = ClientEvent::SendMessage(SendMessage {
            sender_id: "student-1".into(),
            receiver_id: "tutor-1".into(),
            conversation_id: ConversationPair::new("student-1".into(), "tutor-1".into())
                .unwrap()
                .conversation_id(),
            body: "Hello".to_owned(),
        });

        let json = event.to_json().unwrap();
        let restored = ClientEvent::from_json(&json).unwrap();
        assert_eq!(event, restored);
    }

    #[test]
    fn server_event_round_trip() {
        let pair = ConversationPair::new("a".into(), "b".into()).unwrap();
        let event = ServerEvent::Message(Message {
            id: Uuid::new_v4(),
            conversation_id: pair.conversation_id(),
            sender_id: "a".into(),
            receiver_id: "b".into(),
            body: "Hi".to_owned(),
            created_at: Utc::now(),
        });

        let json = event.to_json().unwrap();
        let restored = ServerEvent::from_json(&json).unwrap();
        assert_eq!(event, restored);
    }

    #[test]
    fn event_names_are_kebab_case() {
        let register = ClientEvent::RegisterIdentity {
            user_id: "u1".into(),
        };
        let value: serde_json::Value = serde_json::from_str(&register.to_json().unwrap()).unwrap();
        assert_eq!(value["event"], "register-identity");

        let error = ServerEvent::ConnectionError {
            reason: "store unavailable".to_owned(),
        };
        let value: serde_json::Value = serde_json::from_str(&error.to_json().unwrap()).unwrap();
        assert_eq!(value["event"], "connection-error");
        assert_eq!(value["data"]["reason"], "store unavailable");
    }
}
