//! Opaque bearer tokens, issued per user and checked on every attach.
//!
//! The registry is the shape of a classic "auth token" table: one token
//! maps to one user, a user may hold several tokens, and revoking a token
//! takes effect for the next connection that presents it.

use std::collections::HashMap;

use rand::Rng;
use tokio::sync::RwLock;
use wager_protocol::UserId;

use crate::{Authenticator, SessionError};

/// Issues and validates bearer tokens.
///
/// Reads (every connection attach) vastly outnumber writes (login), so
/// the map sits behind an `RwLock`.
#[derive(Debug, Default)]
pub struct TokenRegistry {
    tokens: RwLock<HashMap<String, UserId>>,
}

impl TokenRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token for `user_id` and returns it.
    pub async fn issue(&self, user_id: UserId) -> String {
        let token = generate_token();
        self.tokens.write().await.insert(token.clone(), user_id);
        tracing::info!(%user_id, "auth token issued");
        token
    }

    /// Revokes a token. Returns the user it belonged to, if any.
    pub async fn revoke(&self, token: &str) -> Option<UserId> {
        let removed = self.tokens.write().await.remove(token);
        if let Some(user_id) = removed {
            tracing::info!(%user_id, "auth token revoked");
        }
        removed
    }

    /// Returns the number of live tokens.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Returns `true` if no tokens are live.
    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

impl Authenticator for TokenRegistry {
    async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
        if token.is_empty() {
            return Err(SessionError::MissingToken);
        }
        self.tokens
            .read()
            .await
            .get(token)
            .copied()
            .ok_or_else(|| SessionError::AuthFailed("unknown token".into()))
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
