//! WebSocket event types.
//!
//! Inbound and outbound events are closed enums dispatched with an explicit
//! `match`, rather than routed by event-name strings.

use serde::{Deserialize, Serialize};

/// Substituted for an empty or absent chat text payload.
pub const NO_MESSAGE_PLACEHOLDER: &str = "no-message";

// ============================================================================
// Events (Client -> Server)
// ============================================================================

/// Events sent from a client to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// A chat message. `text` may be empty or absent; the gateway substitutes
    /// [`NO_MESSAGE_PLACEHOLDER`] before broadcasting.
    ChatMessage {
        #[serde(default)]
        text: Option<String>,
    },
}

// ============================================================================
// Events (Server -> Client)
// ============================================================================

/// Events sent from the gateway to every connected client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// The full set of active connection ids, sent after every admission or
    /// removal.
    PresenceUpdated { connection_ids: Vec<String> },

    /// A relayed chat message with the sender's display name resolved.
    ChatMessage { display_name: String, text: String },
}
