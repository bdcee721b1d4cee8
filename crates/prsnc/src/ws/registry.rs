//! Connection registry: the authoritative table of active sessions.
//!
//! The registry is the single piece of shared mutable state in the gateway.
//! Every operation runs as one critical section of pure in-memory work; in
//! particular, admitting a session scans for an existing session of the same
//! user, evicts it, and inserts the new one atomically, so at most one
//! session per user is ever registered.

use std::collections::HashMap;

use log::{debug, info, warn};
use tokio::sync::{Mutex, mpsc};

use prsnc_protocol::ServerEvent;

/// Size of the per-connection outbound buffer.
const CONNECTION_BUFFER_SIZE: usize = 64;

/// A message queued to one connection's transport task.
#[derive(Debug)]
pub enum SessionMessage {
    /// Push an event to the client.
    Event(ServerEvent),
    /// Close the underlying connection.
    Close,
}

/// Owned send/close capability for one connection.
///
/// The registry entry owns its handle exclusively; nothing outside the
/// registry reaches the transport layer. Pushes are fire-and-forget: a full
/// or closed queue drops the message.
#[derive(Debug)]
pub struct ConnectionHandle {
    tx: mpsc::Sender<SessionMessage>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver its transport task drains.
    pub fn channel() -> (Self, mpsc::Receiver<SessionMessage>) {
        let (tx, rx) = mpsc::channel(CONNECTION_BUFFER_SIZE);
        (Self { tx }, rx)
    }

    /// Queue an event for delivery. Best-effort.
    pub fn push(&self, event: ServerEvent) {
        if self.tx.try_send(SessionMessage::Event(event)).is_err() {
            debug!("dropping event for slow or closed connection");
        }
    }

    /// Signal the transport task to close the connection.
    pub fn close(&self) {
        let _ = self.tx.try_send(SessionMessage::Close);
    }
}

/// One live, authenticated connection.
///
/// Immutable after admission; a reconnecting user gets a fresh session, the
/// existing one is never updated in place.
#[derive(Debug)]
pub struct ConnectedSession {
    pub connection_id: String,
    pub user_id: String,
    pub display_name: String,
    handle: ConnectionHandle,
}

impl ConnectedSession {
    pub fn new(
        connection_id: impl Into<String>,
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        handle: ConnectionHandle,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            user_id: user_id.into(),
            display_name: display_name.into(),
            handle,
        }
    }
}

/// Authoritative table of active connections, keyed by connection id.
#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: Mutex<HashMap<String, ConnectedSession>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit an authenticated session.
    ///
    /// If the same user already has a session, that session's connection is
    /// closed and its entry removed before the new entry is inserted. The
    /// scan, eviction, and insertion happen under one lock so two sessions
    /// for one user can never coexist.
    pub async fn admit(&self, session: ConnectedSession) {
        let mut sessions = self.sessions.lock().await;

        let evicted = sessions
            .values()
            .find(|s| s.user_id == session.user_id)
            .map(|s| s.connection_id.clone());
        if let Some(old_id) = evicted
            && let Some(old) = sessions.remove(&old_id)
        {
            old.handle.close();
            info!(
                "evicted session {} for user {} in favor of {}",
                old_id, session.user_id, session.connection_id
            );
        }

        // Transport-assigned ids are unique for the life of a connection; a
        // collision means the caller broke the admission precondition.
        if let Some(stale) = sessions.insert(session.connection_id.clone(), session) {
            warn!(
                "connection id {} was already registered; closed the stale entry",
                stale.connection_id
            );
            stale.handle.close();
        }
    }

    /// Remove a connection. Idempotent: removing an absent id is a no-op.
    ///
    /// Returns whether an entry was actually removed, so callers announce
    /// presence once even when a forced close races a voluntary one.
    pub async fn remove(&self, connection_id: &str) -> bool {
        self.sessions.lock().await.remove(connection_id).is_some()
    }

    /// Snapshot of the active connection ids.
    pub async fn connection_ids(&self) -> Vec<String> {
        self.sessions.lock().await.keys().cloned().collect()
    }

    /// Cached display name for a connection, or `None` if it already
    /// disconnected. Callers treat `None` as "drop the message".
    pub async fn display_name_of(&self, connection_id: &str) -> Option<String> {
        self.sessions
            .lock()
            .await
            .get(connection_id)
            .map(|s| s.display_name.clone())
    }

    /// Push an event to every registered connection. Best-effort.
    pub async fn broadcast(&self, event: &ServerEvent) {
        for session in self.sessions.lock().await.values() {
            session.handle.push(event.clone());
        }
    }

    /// Announce the current presence set to every registered connection.
    ///
    /// The id list is computed and fanned out under one lock, so the
    /// announced list is exactly the registry state at announcement time.
    pub async fn broadcast_presence(&self) {
        let sessions = self.sessions.lock().await;
        let event = ServerEvent::PresenceUpdated {
            connection_ids: sessions.keys().cloned().collect(),
        };
        for session in sessions.values() {
            session.handle.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(
        connection_id: &str,
        user_id: &str,
        display_name: &str,
    ) -> (ConnectedSession, mpsc::Receiver<SessionMessage>) {
        let (handle, rx) = ConnectionHandle::channel();
        (
            ConnectedSession::new(connection_id, user_id, display_name, handle),
            rx,
        )
    }

    fn drain(rx: &mut mpsc::Receiver<SessionMessage>) -> Vec<SessionMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn admit_registers_the_connection() {
        let registry = ConnectionRegistry::new();
        let (s, _rx) = session("A", "u1", "Alice");
        registry.admit(s).await;

        assert_eq!(registry.connection_ids().await, vec!["A".to_string()]);
        assert_eq!(
            registry.display_name_of("A").await.as_deref(),
            Some("Alice")
        );
    }

    #[tokio::test]
    async fn at_most_one_session_per_user_survives() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = session("A", "u1", "Alice");
        let (b, _rx_b) = session("B", "u1", "Alice");
        registry.admit(a).await;
        registry.admit(b).await;

        assert_eq!(registry.connection_ids().await, vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn eviction_closes_the_old_handle_exactly_once() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = session("A", "u1", "Alice");
        let (b, _rx_b) = session("B", "u1", "Alice");
        registry.admit(a).await;
        registry.admit(b).await;

        let closes = drain(&mut rx_a)
            .into_iter()
            .filter(|m| matches!(m, SessionMessage::Close))
            .count();
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn duplicate_connection_id_closes_the_stale_entry() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = session("A", "u1", "Alice");
        let (dup, _rx_dup) = session("A", "u2", "Bob");
        registry.admit(a).await;
        registry.admit(dup).await;

        // The stale entry under the reused id was closed, and the table holds
        // exactly the newer session.
        let closes = drain(&mut rx_a)
            .into_iter()
            .filter(|m| matches!(m, SessionMessage::Close))
            .count();
        assert_eq!(closes, 1);
        assert_eq!(registry.connection_ids().await, vec!["A".to_string()]);
        assert_eq!(registry.display_name_of("A").await.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn admitting_distinct_users_keeps_both() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = session("A", "u1", "Alice");
        let (c, _rx_c) = session("C", "u2", "Bob");
        registry.admit(a).await;
        registry.admit(c).await;

        let mut ids = registry.connection_ids().await;
        ids.sort();
        assert_eq!(ids, vec!["A".to_string(), "C".to_string()]);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (a, _rx_a) = session("A", "u1", "Alice");
        registry.admit(a).await;

        assert!(registry.remove("A").await);
        assert!(!registry.remove("A").await);
        assert!(registry.connection_ids().await.is_empty());
    }

    #[tokio::test]
    async fn display_name_of_absent_connection_is_none() {
        let registry = ConnectionRegistry::new();
        assert!(registry.display_name_of("ghost").await.is_none());
    }

    #[tokio::test]
    async fn presence_announcement_matches_registry_snapshot() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = session("A", "u1", "Alice");
        registry.admit(a).await;
        registry.broadcast_presence().await;

        let messages = drain(&mut rx_a);
        let [SessionMessage::Event(ServerEvent::PresenceUpdated { connection_ids })] =
            &messages[..]
        else {
            panic!("expected exactly one presence announcement");
        };
        assert_eq!(connection_ids, &registry.connection_ids().await);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_connection() {
        let registry = ConnectionRegistry::new();
        let (a, mut rx_a) = session("A", "u1", "Alice");
        let (c, mut rx_c) = session("C", "u2", "Bob");
        registry.admit(a).await;
        registry.admit(c).await;

        registry
            .broadcast(&ServerEvent::ChatMessage {
                display_name: "Bob".to_string(),
                text: "hi".to_string(),
            })
            .await;

        for rx in [&mut rx_a, &mut rx_c] {
            let messages = drain(rx);
            assert!(matches!(
                &messages[..],
                [SessionMessage::Event(ServerEvent::ChatMessage { text, .. })] if text == "hi"
            ));
        }
    }

    #[tokio::test]
    async fn push_to_full_queue_drops_instead_of_blocking() {
        let (handle, mut rx) = ConnectionHandle::channel();
        for _ in 0..200 {
            handle.push(ServerEvent::PresenceUpdated {
                connection_ids: Vec::new(),
            });
        }
        // The queue is bounded; the overflow was dropped, not queued.
        assert!(drain(&mut rx).len() < 200);
    }
}
