//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenVerifier;
use crate::directory::UserDirectory;
use crate::ws::ChatHub;

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Connection registry + presence/chat fan-out.
    pub hub: Arc<ChatHub>,
    /// Session token verifier.
    pub verifier: Arc<TokenVerifier>,
    /// User directory collaborator.
    pub directory: Arc<dyn UserDirectory>,
    /// Budget for the authentication phase of a new connection.
    pub handshake_timeout: Duration,
}

impl AppState {
    pub fn new(
        verifier: TokenVerifier,
        directory: Arc<dyn UserDirectory>,
        handshake_timeout: Duration,
    ) -> Self {
        Self {
            hub: Arc::new(ChatHub::new()),
            verifier: Arc::new(verifier),
            directory,
            handshake_timeout,
        }
    }
}
