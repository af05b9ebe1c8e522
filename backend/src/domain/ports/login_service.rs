//! Driving port for sign-in.
//!
//! Inbound adapters call this port to exchange a username and secret for a
//! trusted identity, registering the account on first use.

use async_trait::async_trait;

use crate::domain::{Error, Identification, LoginCredentials};

/// Domain use-case port for sign-in with first-use registration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoginService: Send + Sync {
    /// Verify `credentials`, creating the account when the username is new.
    ///
    /// # Errors
    /// [`crate::domain::ErrorCode::Unauthorized`] when the secret does not
    /// match the stored credential.
    async fn identify(&self, credentials: &LoginCredentials) -> Result<Identification, Error>;
}
