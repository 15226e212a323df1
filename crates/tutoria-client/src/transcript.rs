//! In-memory transcript of one open conversation.
//!
//! Own messages are appended optimistically at send time; the server never
//! echoes them back.  Incoming messages append in arrival order, which
//! matches server persistence order, and entries are never reordered after
//! the fact.

use tutoria_shared::types::Message;

/// One transcript line.  `local` marks an optimistic own message.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub message: Message,
    pub local: bool,
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the transcript with server history (from initialize).
    pub fn load_history(&mut self, messages: Vec<Message>) {
        self.entries = messages
            .into_iter()
            .map(|message| TranscriptEntry {
                message,
                local: false,
            })
            .collect();
    }

    /// Append an own message at send time.
    pub fn push_local(&mut self, message: Message) {
        self.entries.push(TranscriptEntry {
            message,
            local: true,
        });
    }

    /// Append an incoming message.  Duplicate ids (a replay overlapping a
    /// live delivery) are dropped.
    pub fn push_remote(&mut self, message: Message) {
        if self.entries.iter().any(|e| e.message.id == message.id) {
            return;
        }
        self.entries.push(TranscriptEntry {
            message,
            local: false,
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tutoria_shared::types::ConversationPair;
    use uuid::Uuid;

    fn message(body: &str) -> Message {
        let pair = ConversationPair::new("a".into(), "b".into()).unwrap();
        Message {
            id: Uuid::new_v4(),
            conversation_id: pair.conversation_id(),
            sender_id: "a".into(),
            receiver_id: "b".into(),
            body: body.to_owned(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn history_then_local_then_remote_keeps_arrival_order() {
        let mut transcript = Transcript::new();
        transcript.load_history(vec![message("one"), message("two")]);
        transcript.push_local(message("three"));
        transcript.push_remote(message("four"));

        let bodies: Vec<&str> = transcript
            .entries()
            .iter()
            .map(|e| e.message.body.as_str())
            .collect();
        assert_eq!(bodies, vec!["one", "two", "three", "four"]);
        assert!(transcript.entries()[2].local);
        assert!(!transcript.entries()[3].local);
    }

    #[test]
    fn remote_duplicates_are_dropped() {
        let mut transcript = Transcript::new();
        let m = message("hello");

        transcript.push_remote(m.clone());
        transcript.push_remote(m);
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn load_history_replaces_previous_entries() {
        let mut transcript = Transcript::new();
        transcript.push_local(message("stale"));

        transcript.load_history(vec![message("fresh")]);
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.entries()[0].message.body, "fresh");
    }
}
