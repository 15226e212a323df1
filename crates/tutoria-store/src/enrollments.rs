//! Enrollment relationships and the contact projection built on top of them.
//!
//! Enrollments are owned by the external platform; the store mirrors the
//! tutor/student/offering triples so that the directory queries stay local
//! and testable.

use chrono::Utc;
use rusqlite::params;

use crate::database::Database;
use crate::error::Result;
use tutoria_shared::types::{Contact, Role, UserId};

impl Database {
    /// Record that `tutor_id` teaches `student_id` in `offering`.
    /// Re-recording the same triple is a no-op.
    pub fn add_enrollment(&self, tutor_id: &UserId, student_id: &UserId, offering: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO enrollments (tutor_id, student_id, offering, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                tutor_id.as_str(),
                student_id.as_str(),
                offering,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Distinct students across all offerings taught by `tutor_id`,
    /// ordered by display name.
    pub fn students_of_tutor(&self, tutor_id: &UserId) -> Result<Vec<Contact>> {
        self.contact_query(
            "SELECT DISTINCT u.id, u.display_name, u.role
             FROM enrollments e
             JOIN users u ON u.id = e.student_id
             WHERE e.tutor_id = ?1
             ORDER BY u.display_name COLLATE NOCASE, u.id",
            tutor_id,
        )
    }

    /// Distinct tutors currently teaching `student_id`, ordered by display name.
    pub fn tutors_of_student(&self, student_id: &UserId) -> Result<Vec<Contact>> {
        self.contact_query(
            "SELECT DISTINCT u.id, u.display_name, u.role
             FROM enrollments e
             JOIN users u ON u.id = e.tutor_id
             WHERE e.student_id = ?1
             ORDER BY u.display_name COLLATE NOCASE, u.id",
            student_id,
        )
    }

    /// Every user except `user_id`, ordered by display name.
    pub fn all_users_except(&self, user_id: &UserId) -> Result<Vec<Contact>> {
        self.contact_query(
            "SELECT id, display_name, role
             FROM users
             WHERE id != ?1
             ORDER BY display_name COLLATE NOCASE, id",
            user_id,
        )
    }

    fn contact_query(&self, sql: &str, id: &UserId) -> Result<Vec<Contact>> {
        let mut stmt = self.conn().prepare(sql)?;
        let rows = stmt.query_map(params![id.as_str()], row_to_contact)?;

        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row?);
        }
        Ok(contacts)
    }
}

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    let id: String = row.get(0)?;
    let display_name: String = row.get(1)?;
    let role_str: String = row.get(2)?;

    let role = Role::parse(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown role: {role_str}").into(),
        )
    })?;

    Ok(Contact {
        user_id: UserId::new(id),
        display_name,
        role,
    })
}
