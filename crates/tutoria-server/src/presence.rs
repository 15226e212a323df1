//! Presence registry: user identity → currently live connection.
//!
//! Maintains the process-wide map consulted by the router when it forwards a
//! message.  At most one live connection exists per user at any instant;
//! registering again unconditionally replaces the previous entry.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use tutoria_shared::protocol::ServerEvent;
use tutoria_shared::types::UserId;

/// Handle to one live client connection: an id distinguishing this socket
/// from any later socket of the same user, plus its outbound event buffer.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: Uuid,
    outbox: mpsc::Sender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(outbox: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            outbox,
        }
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    /// Queue an event for delivery without blocking.  Returns `false` when
    /// the connection is gone or its buffer is full; the live copy is dropped
    /// in that case (a routed message still exists in persisted history).
    pub fn deliver(&self, event: ServerEvent) -> bool {
        match self.outbox.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                debug!(
                    connection = %self.connection_id,
                    error = %e,
                    "dropping live delivery"
                );
                false
            }
        }
    }
}

/// Tracks the single live connection of every registered user.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: Mutex<HashMap<UserId, ConnectionHandle>>,
}

impl PresenceRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `user_id` to `handle`, unconditionally replacing any existing
    /// entry.  Returns the evicted handle when a *different* connection was
    /// registered before; the superseded socket stays open but is no longer
    /// addressable, and closing it is the caller's concern.
    pub fn register(&self, user_id: UserId, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let mut entries = self.lock();
        let previous = entries.insert(user_id.clone(), handle.clone());

        match previous {
            Some(prev) if prev.connection_id != handle.connection_id => {
                debug!(
                    user = %user_id,
                    superseded = %prev.connection_id,
                    "replaced presence entry"
                );
                Some(prev)
            }
            _ => None,
        }
    }

    /// Remove the entry for `user_id`, but only if it still points at
    /// `connection_id`.  A stale disconnect must not evict a newer
    /// registration.  Returns whether an entry was removed.
    pub fn unregister(&self, user_id: &UserId, connection_id: Uuid) -> bool {
        let mut entries = self.lock();
        match entries.get(user_id) {
            Some(current) if current.connection_id == connection_id => {
                entries.remove(user_id);
                debug!(user = %user_id, "removed presence entry");
                true
            }
            _ => false,
        }
    }

    /// Current connection handle of `user_id`, if online.  Never blocks.
    pub fn lookup(&self, user_id: &UserId) -> Option<ConnectionHandle> {
        self.lock().get(user_id).cloned()
    }

    /// Number of users with a live connection.
    pub fn online_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, ConnectionHandle>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutoria_shared::constants::OUTBOX_CAPACITY;

    fn test_handle() -> (ConnectionHandle, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
        (ConnectionHandle::new(tx), rx)
    }

    #[test]
    fn register_lookup_unregister() {
        let registry = PresenceRegistry::new();
        let user: UserId = "student-1".into();
        let (handle, _rx) = test_handle();

        assert!(registry.lookup(&user).is_none());
        assert_eq!(registry.online_count(), 0);

        assert!(registry.register(user.clone(), handle.clone()).is_none());
        let found = registry.lookup(&user).unwrap();
        assert_eq!(found.connection_id(), handle.connection_id());
        assert_eq!(registry.online_count(), 1);

        assert!(registry.unregister(&user, handle.connection_id()));
        assert!(registry.lookup(&user).is_none());
        assert_eq!(registry.online_count(), 0);
    }

    #[test]
    fn register_replaces_previous_connection() {
        let registry = PresenceRegistry::new();
        let user: UserId = "student-1".into();
        let (c1, _rx1) = test_handle();
        let (c2, _rx2) = test_handle();

        registry.register(user.clone(), c1.clone());
        let evicted = registry.register(user.clone(), c2.clone()).unwrap();

        assert_eq!(evicted.connection_id(), c1.connection_id());
        // Lookup returns the latest connection, never the evicted one.
        assert_eq!(
            registry.lookup(&user).unwrap().connection_id(),
            c2.connection_id()
        );
    }

    #[test]
    fn re_registering_same_connection_evicts_nothing() {
        let registry = PresenceRegistry::new();
        let user: UserId = "student-1".into();
        let (handle, _rx) = test_handle();

        registry.register(user.clone(), handle.clone());
        assert!(registry.register(user, handle).is_none());
    }

    #[test]
    fn stale_unregister_does_not_evict_newer_registration() {
        let registry = PresenceRegistry::new();
        let user: UserId = "student-1".into();
        let (old, _rx1) = test_handle();
        let (new, _rx2) = test_handle();

        registry.register(user.clone(), old.clone());
        registry.register(user.clone(), new.clone());

        // The old connection's disconnect arrives late.
        assert!(!registry.unregister(&user, old.connection_id()));
        assert_eq!(
            registry.lookup(&user).unwrap().connection_id(),
            new.connection_id()
        );
    }

    #[test]
    fn deliver_drops_when_buffer_is_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = ConnectionHandle::new(tx);

        let event = ServerEvent::ConnectionError {
            reason: "test".to_owned(),
        };

        assert!(handle.deliver(event.clone()));
        assert!(!handle.deliver(event.clone()));

        // Draining frees the buffer again.
        assert!(rx.try_recv().is_ok());
        assert!(handle.deliver(event));
    }
}
