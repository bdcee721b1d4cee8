//! Authentication errors.

use thiserror::Error;

/// Why a handshake was rejected.
///
/// Every variant has the same externally visible outcome: the connection is
/// closed without detail. The distinction exists only for server-side logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no session token in handshake")]
    MissingToken,

    #[error("invalid session token: {0}")]
    InvalidToken(String),

    #[error("session token expired")]
    TokenExpired,

    #[error("user not found")]
    UserNotFound,

    #[error("user is not active")]
    UserInactive,

    #[error("authentication handshake timed out")]
    HandshakeTimeout,

    #[error("internal auth error: {0}")]
    Internal(String),
}
