use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use tutoria_shared::types::{ConversationId, Message, UserId};

impl Database {
    /// Append a message to the log.  The `seq` rowid assigned here captures
    /// arrival order and breaks ties between equal timestamps.
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id.to_string(),
                message.conversation_id.0.to_string(),
                message.sender_id.as_str(),
                message.receiver_id.as_str(),
                message.body,
                encode_ts(&message.created_at),
            ],
        )?;
        Ok(())
    }

    /// Full ordered history of a conversation: `(created_at, seq)` ascending.
    pub fn conversation_history(&self, conversation_id: ConversationId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, conversation_id, sender_id, receiver_id, body, created_at
             FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at ASC, seq ASC",
        )?;

        let rows = stmt.query_map(params![conversation_id.0.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Timestamp of the newest persisted message in a conversation, used to
    /// seed the router clock after a restart.
    pub fn last_created_at(&self, conversation_id: ConversationId) -> Result<Option<DateTime<Utc>>> {
        let mut stmt = self.conn().prepare(
            "SELECT created_at FROM messages
             WHERE conversation_id = ?1
             ORDER BY created_at DESC, seq DESC
             LIMIT 1",
        )?;

        let mut rows = stmt.query_map(params![conversation_id.0.to_string()], |row| {
            row.get::<_, String>(0)
        })?;

        match rows.next() {
            Some(ts_str) => {
                let parsed = DateTime::parse_from_rfc3339(&ts_str?)
                    .map(|dt| dt.with_timezone(&Utc))?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    /// Number of persisted messages in a conversation.
    pub fn message_count(&self, conversation_id: ConversationId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id.0.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

// Fixed-width RFC-3339 (nanosecond precision) so the (conversation, created_at,
// seq) index compares timestamps correctly as text.
fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let conversation_str: String = row.get(1)?;
    let sender_id: String = row.get(2)?;
    let receiver_id: String = row.get(3)?;
    let body: String = row.get(4)?;
    let ts_str: String = row.get(5)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let conversation_id = Uuid::parse_str(&conversation_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Message {
        id,
        conversation_id: ConversationId(conversation_id),
        sender_id: UserId::new(sender_id),
        receiver_id: UserId::new(receiver_id),
        body,
        created_at,
    })
}
