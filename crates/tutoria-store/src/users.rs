use chrono::Utc;
use rusqlite::params;

use crate::database::Database;
use crate::error::{Result, StoreError};
use tutoria_shared::types::{Role, User, UserId};

impl Database {
    /// Insert or refresh a user record.  Users are owned by the external auth
    /// system; the store only mirrors them, so a replace is always safe.
    pub fn upsert_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, role, display_name, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET role = ?2, display_name = ?3",
            params![
                user.id.as_str(),
                user.role.as_str(),
                user.display_name,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_user(&self, id: &UserId) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, role, display_name FROM users WHERE id = ?1",
                params![id.as_str()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Whether a user record exists for the given identity.
    pub fn user_exists(&self, id: &UserId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE id = ?1",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let role_str: String = row.get(1)?;
    let display_name: String = row.get(2)?;

    let role = Role::parse(&role_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("unknown role: {role_str}").into(),
        )
    })?;

    Ok(User {
        id: UserId::new(id),
        role,
        display_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        let user = User {
            id: "tutor-1".into(),
            role: Role::Tutor,
            display_name: "Ada Lovelace".to_owned(),
        };

        db.upsert_user(&user).unwrap();
        assert_eq!(db.get_user(&"tutor-1".into()).unwrap(), user);
        assert!(db.user_exists(&"tutor-1".into()).unwrap());
        assert!(!db.user_exists(&"tutor-2".into()).unwrap());

        // Upsert with a new display name replaces the row.
        let renamed = User {
            display_name: "A. Lovelace".to_owned(),
            ..user
        };
        db.upsert_user(&renamed).unwrap();
        assert_eq!(db.get_user(&"tutor-1".into()).unwrap(), renamed);
    }

    #[test]
    fn get_missing_user_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        assert!(matches!(
            db.get_user(&"ghost".into()),
            Err(StoreError::NotFound)
        ));
    }
}
