use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use tutoria_shared::types::{Conversation, ConversationId, ConversationPair, UserId};

impl Database {
    /// Create the conversation for `pair` if it does not exist, then return
    /// the stored record.
    ///
    /// The id is derived deterministically from the normalized pair and the
    /// insert is `INSERT OR IGNORE` against a `UNIQUE pair_key`, so this is
    /// an atomic create-if-absent: concurrent callers for the same pair all
    /// converge on one row.
    pub fn create_or_get_conversation(&self, pair: &ConversationPair) -> Result<Conversation> {
        let id = pair.conversation_id();

        self.conn().execute(
            "INSERT OR IGNORE INTO conversations (id, pair_key, participant_a, participant_b, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.0.to_string(),
                pair.key(),
                pair.a().as_str(),
                pair.b().as_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;

        self.get_conversation(id)
    }

    pub fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        self.conn()
            .query_row(
                "SELECT id, participant_a, participant_b, created_at
                 FROM conversations WHERE id = ?1",
                params![id.0.to_string()],
                row_to_conversation,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let id_str: String = row.get(0)?;
    let participant_a: String = row.get(1)?;
    let participant_b: String = row.get(2)?;
    let ts_str: String = row.get(3)?;

    let id = uuid::Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&ts_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Conversation {
        id: ConversationId(id),
        participant_a: UserId::new(participant_a),
        participant_b: UserId::new(participant_b),
        created_at,
    })
}
