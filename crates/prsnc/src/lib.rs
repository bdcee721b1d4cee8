//! prsnc - realtime presence and chat gateway.
//!
//! Authenticates persistent WebSocket connections with a signed session
//! token, enforces a single active session per user, and fans out presence
//! and chat events to every connected party. Single-process and in-memory;
//! delivery is best-effort by design.

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod ws;
