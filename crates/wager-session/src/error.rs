//! Error types for the session layer.

/// Errors that can occur while establishing who a connection belongs to.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No credential was presented at all.
    #[error("authentication required")]
    MissingToken,

    /// Authentication failed: the token was invalid, revoked, or rejected
    /// by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),
}
