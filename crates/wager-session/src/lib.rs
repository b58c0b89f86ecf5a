//! Identity for wager room connections.
//!
//! 1. **Authentication**: turning a presented token into a [`UserId`]
//!    ([`Authenticator`] trait)
//! 2. **Token issuance**: an in-process registry of opaque bearer tokens
//!    ([`TokenRegistry`]) for deployments without an external auth service
//!
//! ```text
//! Connection gate (above)  ← asks "who is this?" before admitting to a room
//!     ↕
//! Session layer (this crate)
//!     ↕
//! Protocol layer (below)  ← provides UserId
//! ```
//!
//! [`UserId`]: wager_protocol::UserId

#![allow(async_fn_in_trait)]

mod auth;
mod error;
mod tokens;

pub use auth::Authenticator;
pub use error::SessionError;
pub use tokens::TokenRegistry;
