//! Async facade over the synchronous history store.
//!
//! `tutoria-store` exposes a blocking `rusqlite` handle.  Every call here is
//! lifted onto the blocking pool and bounded by a timeout, so a wedged
//! database surfaces as [`ServerError::StoreUnavailable`] instead of hanging
//! the calling session, and persistence never blocks the event handling of
//! other connections.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tutoria_shared::types::{
    Contact, Conversation, ConversationId, ConversationPair, Message, User, UserId,
};
use tutoria_store::{Database, StoreError};

use crate::error::ServerError;

/// Shared, clonable handle to the history store.
#[derive(Clone)]
pub struct HistoryStore {
    db: Arc<Mutex<Database>>,
    timeout: Duration,
}

impl HistoryStore {
    pub fn new(db: Database, timeout: Duration) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            timeout,
        }
    }

    /// Run a store closure on the blocking pool with the configured timeout.
    async fn call<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Database) -> tutoria_store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let task = tokio::task::spawn_blocking(move || {
            let guard = db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&guard)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Err(_) => Err(ServerError::StoreUnavailable(
                "store call timed out".to_owned(),
            )),
            Ok(Err(join_err)) => Err(ServerError::StoreUnavailable(format!(
                "store task failed: {join_err}"
            ))),
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(StoreError::NotFound))) => {
                Err(ServerError::NotFound("record not found".to_owned()))
            }
            Ok(Ok(Err(e))) => Err(ServerError::StoreUnavailable(e.to_string())),
        }
    }

    pub async fn get_user(&self, id: &UserId) -> Result<User, ServerError> {
        let id = id.clone();
        self.call(move |db| db.get_user(&id)).await
    }

    pub async fn create_or_get_conversation(
        &self,
        pair: &ConversationPair,
    ) -> Result<Conversation, ServerError> {
        let pair = pair.clone();
        self.call(move |db| db.create_or_get_conversation(&pair))
            .await
    }

    pub async fn get_conversation(&self, id: ConversationId) -> Result<Conversation, ServerError> {
        self.call(move |db| db.get_conversation(id)).await
    }

    pub async fn conversation_history(
        &self,
        id: ConversationId,
    ) -> Result<Vec<Message>, ServerError> {
        self.call(move |db| db.conversation_history(id)).await
    }

    pub async fn insert_message(&self, message: Message) -> Result<(), ServerError> {
        self.call(move |db| db.insert_message(&message)).await
    }

    pub async fn last_created_at(
        &self,
        id: ConversationId,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>, ServerError> {
        self.call(move |db| db.last_created_at(id)).await
    }

    pub async fn students_of_tutor(&self, id: &UserId) -> Result<Vec<Contact>, ServerError> {
        let id = id.clone();
        self.call(move |db| db.students_of_tutor(&id)).await
    }

    pub async fn tutors_of_student(&self, id: &UserId) -> Result<Vec<Contact>, ServerError> {
        let id = id.clone();
        self.call(move |db| db.tutors_of_student(&id)).await
    }

    pub async fn all_users_except(&self, id: &UserId) -> Result<Vec<Contact>, ServerError> {
        let id = id.clone();
        self.call(move |db| db.all_users_except(&id)).await
    }
}
