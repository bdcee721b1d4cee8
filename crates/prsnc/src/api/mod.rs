//! HTTP surface: application state and the router.
//!
//! The gateway exposes only the WebSocket endpoint and an unauthenticated
//! health check. Everything else lives behind the external collaborators.

mod handlers;
mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
