//! Realtime gateway: connection registry, hub, and WebSocket protocol.

pub mod gateway;
pub mod hub;
pub mod registry;

pub use hub::ChatHub;
pub use registry::{ConnectedSession, ConnectionHandle, ConnectionRegistry, SessionMessage};
