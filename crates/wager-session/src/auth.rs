//! Authentication hook for validating user identity.
//!
//! Account creation and credential issuance live outside the room engine.
//! All the engine needs is a way to turn the credential a connection
//! presents into a [`UserId`]. That is the [`Authenticator`] trait: one
//! async method, implemented by whatever issues credentials (the bundled
//! [`TokenRegistry`](crate::TokenRegistry), a JWT validator, a test stub).

use wager_protocol::UserId;

use crate::SessionError;

/// Validates a client's auth token and returns their identity.
///
/// `Send + Sync + 'static` because the authenticator lives as long as the
/// server and is called from many connection tasks at once.
///
/// # Example
///
/// ```rust
/// use wager_session::{Authenticator, SessionError};
/// use wager_protocol::UserId;
///
/// /// Accepts any numeric token as the user id. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
///         let id: u64 = token.parse().map_err(|_| {
///             SessionError::AuthFailed("token must be a number".into())
///         })?;
///         Ok(UserId(id))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the given token and returns the user's identity.
    ///
    /// # Returns
    /// - `Ok(UserId)`: authentication succeeded
    /// - `Err(SessionError::AuthFailed)`: token is invalid or revoked
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserId, SessionError>> + Send;
}
