//! Chat hub: presence announcements and message relay on top of the registry.

use log::debug;

use prsnc_protocol::{NO_MESSAGE_PLACEHOLDER, ServerEvent};

use super::registry::{ConnectedSession, ConnectionRegistry};

/// Coordinates the connection registry with presence and chat fan-out.
///
/// Announcements are emitted strictly after the registry mutation that caused
/// them has committed. Delivery is best-effort throughout: no acks, no
/// retries, no backpressure beyond the bounded per-connection queues.
#[derive(Default)]
pub struct ChatHub {
    registry: ConnectionRegistry,
}

impl ChatHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Admit an authenticated session and announce the updated presence set
    /// to everyone, the new session included.
    pub async fn admit(&self, session: ConnectedSession) {
        self.registry.admit(session).await;
        self.registry.broadcast_presence().await;
    }

    /// Drop a connection and announce the updated presence set.
    ///
    /// Safe to call from both the eviction path and the voluntary-close path
    /// of the same connection; only the call that actually removed the entry
    /// announces.
    pub async fn disconnect(&self, connection_id: &str) {
        if self.registry.remove(connection_id).await {
            self.registry.broadcast_presence().await;
        }
    }

    /// Relay a chat message from `connection_id` to every connected party,
    /// the sender included.
    ///
    /// A sender that already disconnected resolves to no display name; the
    /// message is dropped silently. Empty or absent text is replaced with the
    /// placeholder rather than rejected.
    pub async fn relay(&self, connection_id: &str, text: Option<String>) {
        let Some(display_name) = self.registry.display_name_of(connection_id).await else {
            debug!(
                "dropping message from {}: connection no longer registered",
                connection_id
            );
            return;
        };

        let text = match text {
            Some(text) if !text.is_empty() => text,
            _ => NO_MESSAGE_PLACEHOLDER.to_string(),
        };

        self.registry
            .broadcast(&ServerEvent::ChatMessage { display_name, text })
            .await;
    }
}
