//! Conversation resolution: unordered participant pair → stable conversation.
//!
//! The conversation id is derived deterministically from the normalized pair
//! and created in the store with an atomic create-if-absent, so concurrent
//! initialize calls from both participants converge on one record and never
//! produce duplicates.

use tracing::debug;

use tutoria_shared::protocol::InitializeResponse;
use tutoria_shared::types::{ConversationPair, UserId};

use crate::error::ServerError;
use crate::history::HistoryStore;

pub struct ConversationResolver {
    history: HistoryStore,
}

impl ConversationResolver {
    pub fn new(history: HistoryStore) -> Self {
        Self { history }
    }

    /// Resolve (creating if absent) the conversation between `user_id` and
    /// `partner_id`, returning its id and full ordered history.  A fresh
    /// conversation has an empty history.
    ///
    /// Store failures surface as [`ServerError::StoreUnavailable`]; retries
    /// belong to the caller, not this component.
    pub async fn initialize(
        &self,
        user_id: &UserId,
        partner_id: &UserId,
    ) -> Result<InitializeResponse, ServerError> {
        let pair = ConversationPair::new(user_id.clone(), partner_id.clone()).ok_or_else(|| {
            ServerError::BadRequest("cannot open a conversation with yourself".to_owned())
        })?;

        // Both identities must be known to the auth mirror.
        for id in [user_id, partner_id] {
            match self.history.get_user(id).await {
                Ok(_) => {}
                Err(ServerError::NotFound(_)) => {
                    return Err(ServerError::BadRequest(format!("unknown identity: {id}")));
                }
                Err(other) => return Err(other),
            }
        }

        let conversation = self.history.create_or_get_conversation(&pair).await?;
        let messages = self.history.conversation_history(conversation.id).await?;

        debug!(
            conversation = %conversation.id,
            a = %conversation.participant_a,
            b = %conversation.participant_b,
            history_len = messages.len(),
            "conversation initialized"
        );

        Ok(InitializeResponse {
            conversation_id: conversation.id,
            messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tutoria_shared::types::{Role, User};
    use tutoria_store::Database;

    fn resolver_with_users() -> (tempfile::TempDir, ConversationResolver) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();

        for (id, role, name) in [
            ("student-1", Role::Student, "Linus"),
            ("tutor-1", Role::Tutor, "Ada"),
        ] {
            db.upsert_user(&User {
                id: id.into(),
                role,
                display_name: name.to_owned(),
            })
            .unwrap();
        }

        let history = HistoryStore::new(db, Duration::from_secs(2));
        (dir, ConversationResolver::new(history))
    }

    #[tokio::test]
    async fn fresh_conversation_has_empty_history() {
        let (_dir, resolver) = resolver_with_users();

        let response = resolver
            .initialize(&"student-1".into(), &"tutor-1".into())
            .await
            .unwrap();
        assert!(response.messages.is_empty());
    }

    #[tokio::test]
    async fn initialize_is_idempotent_and_order_independent() {
        let (_dir, resolver) = resolver_with_users();

        let first = resolver
            .initialize(&"student-1".into(), &"tutor-1".into())
            .await
            .unwrap();
        let flipped = resolver
            .initialize(&"tutor-1".into(), &"student-1".into())
            .await
            .unwrap();
        let again = resolver
            .initialize(&"student-1".into(), &"tutor-1".into())
            .await
            .unwrap();

        assert_eq!(first.conversation_id, flipped.conversation_id);
        assert_eq!(first.conversation_id, again.conversation_id);
    }

    #[tokio::test]
    async fn concurrent_initialize_converges() {
        let (_dir, resolver) = resolver_with_users();

        let student = "student-1".into();
        let tutor = "tutor-1".into();
        let (a, b) = tokio::join!(
            resolver.initialize(&student, &tutor),
            resolver.initialize(&tutor, &student),
        );

        assert_eq!(a.unwrap().conversation_id, b.unwrap().conversation_id);
    }

    #[tokio::test]
    async fn self_conversation_is_rejected() {
        let (_dir, resolver) = resolver_with_users();

        let result = resolver
            .initialize(&"student-1".into(), &"student-1".into())
            .await;
        assert!(matches!(result, Err(ServerError::BadRequest(_))));
    }

    #[tokio::test]
    async fn unknown_identity_is_rejected() {
        let (_dir, resolver) = resolver_with_users();

        let result = resolver
            .initialize(&"student-1".into(), &"ghost".into())
            .await;
        assert!(matches!(result, Err(ServerError::BadRequest(_))));
    }
}
