//! Authentication module.
//!
//! Validates the signed session token presented during the WebSocket
//! handshake and extracts the subject identifier. Authentication failures are
//! deliberately indistinguishable to the rejected party: the connection is
//! closed without a diagnostic payload.

mod claims;
mod error;
mod verifier;

pub use claims::Claims;
pub use error::AuthError;
pub use verifier::{TokenVerifier, token_from_header};
