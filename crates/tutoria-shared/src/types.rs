use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::CONVERSATION_NAMESPACE;

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Opaque user identity, minted by the external auth system.  The chat core
/// never inspects its structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Platform role of a user.  Assigned by the external auth system; the chat
/// core only reads it to shape the contact directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Tutor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Tutor => "tutor",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" => Some(Role::Student),
            "tutor" => Some(Role::Tutor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

/// Identifier of the channel between exactly two participants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConversationId(pub Uuid);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The unordered pair of participant identities that uniquely determines a
/// conversation.  Construction normalizes the pair so that `a <= b`; the
/// conversation identifier is then derived deterministically, so both
/// participants resolve the same conversation no matter which of them asks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationPair {
    a: UserId,
    b: UserId,
}

impl ConversationPair {
    /// Build a normalized pair.  Returns `None` when both identities are the
    /// same user; a conversation needs two distinct participants.
    pub fn new(x: UserId, y: UserId) -> Option<Self> {
        if x == y {
            return None;
        }
        if x < y {
            Some(Self { a: x, b: y })
        } else {
            Some(Self { a: y, b: x })
        }
    }

    pub fn a(&self) -> &UserId {
        &self.a
    }

    pub fn b(&self) -> &UserId {
        &self.b
    }

    /// Stable storage key for the pair.  The separator is a newline, which
    /// cannot collide with reasonable single-line identifiers.
    pub fn key(&self) -> String {
        format!("{}\n{}", self.a, self.b)
    }

    /// Deterministic conversation identifier: UUID v5 of the normalized pair
    /// key.  Concurrent initialize calls for the same pair converge on this
    /// value without coordination.
    pub fn conversation_id(&self) -> ConversationId {
        ConversationId(Uuid::new_v5(&CONVERSATION_NAMESPACE, self.key().as_bytes()))
    }

    pub fn contains(&self, id: &UserId) -> bool {
        &self.a == id || &self.b == id
    }

    /// The counterpart of `id` in this pair, if `id` is a participant.
    pub fn other(&self, id: &UserId) -> Option<&UserId> {
        if &self.a == id {
            Some(&self.b)
        } else if &self.b == id {
            Some(&self.a)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Domain records
// ---------------------------------------------------------------------------

/// A user as read from the external auth system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub role: Role,
    pub display_name: String,
}

/// A user visible to the current user as an eligible chat partner.
/// Recomputed on every directory fetch; never cached by the core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
}

/// A conversation record: identifier plus its (normalized) participant pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub participant_a: UserId,
    pub participant_b: UserId,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn contains(&self, id: &UserId) -> bool {
        &self.participant_a == id || &self.participant_b == id
    }
}

/// A single chat message.  Created once by the router, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub body: String,
    /// Server-assigned, strictly increasing within a conversation.
    pub created_at: DateTime<Utc>,
}
