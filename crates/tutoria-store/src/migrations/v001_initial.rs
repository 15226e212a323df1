//! v001 -- Initial schema creation.
//!
//! Creates the four core tables: `users`, `enrollments`, `conversations`,
//! and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (mirrored from the external auth system)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id           TEXT PRIMARY KEY NOT NULL,   -- opaque external identity
    role         TEXT NOT NULL,               -- student | tutor | admin
    display_name TEXT NOT NULL,
    created_at   TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Enrollments (mirrored from the external enrollment system)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS enrollments (
    tutor_id   TEXT NOT NULL,                 -- FK -> users(id)
    student_id TEXT NOT NULL,                 -- FK -> users(id)
    offering   TEXT NOT NULL,                 -- course / subject identifier
    created_at TEXT NOT NULL,

    PRIMARY KEY (tutor_id, student_id, offering),
    FOREIGN KEY (tutor_id)   REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (student_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_enrollments_student ON enrollments(student_id);

-- ----------------------------------------------------------------
-- Conversations (one per unordered participant pair)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v5 of the pair key
    pair_key      TEXT NOT NULL UNIQUE,       -- normalized participant pair
    participant_a TEXT NOT NULL,              -- lexicographically smaller id
    participant_b TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Messages (append-only)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,  -- arrival order
    id              TEXT NOT NULL UNIQUE,               -- UUID v4
    conversation_id TEXT NOT NULL,                      -- FK -> conversations(id)
    sender_id       TEXT NOT NULL,
    receiver_id     TEXT NOT NULL,
    body            TEXT NOT NULL,
    created_at      TEXT NOT NULL,                      -- fixed-width RFC-3339

    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation
    ON messages(conversation_id, created_at, seq);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
