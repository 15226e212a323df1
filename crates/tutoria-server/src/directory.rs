//! Contact directory: role-filtered projection of eligible chat partners.
//!
//! Purely a read over the mirrored enrollment data; recomputed on every
//! fetch.  Substring search happens client-side.

use tutoria_shared::types::{Contact, Role, UserId};

use crate::error::ServerError;
use crate::history::HistoryStore;

pub struct ContactDirectory {
    history: HistoryStore,
}

impl ContactDirectory {
    pub fn new(history: HistoryStore) -> Self {
        Self { history }
    }

    /// Eligible chat partners of `user_id`, ordered by display name with no
    /// duplicate identity:
    /// - tutors see the distinct students across their taught offerings,
    /// - students see their current tutor(s),
    /// - admins see every user except themselves.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Contact>, ServerError> {
        let user = self.history.get_user(user_id).await?;

        match user.role {
            Role::Tutor => self.history.students_of_tutor(user_id).await,
            Role::Student => self.history.tutors_of_student(user_id).await,
            Role::Admin => self.history.all_users_except(user_id).await,
        }
    }
}
