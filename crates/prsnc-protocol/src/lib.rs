//! Canonical wire types for the prsnc gateway.
//!
//! These types define the protocol between clients and the gateway over
//! WebSocket. Both sides exchange JSON-encoded, type-tagged events.

mod events;

pub use events::{ClientEvent, NO_MESSAGE_PLACEHOLDER, ServerEvent};
