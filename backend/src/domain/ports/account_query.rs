//! Driving port for caller resolution and account reads.
//!
//! Every authorised request resolves its bearer credentials through this port
//! so the stored credential is re-checked on each call.

use async_trait::async_trait;

use crate::domain::{AccountSnapshot, Error, LoginCredentials, UserIdentity};

/// Domain use-case port for read endpoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountQuery: Send + Sync {
    /// Re-validate credentials for an existing account. Never registers.
    async fn resolve(&self, credentials: &LoginCredentials) -> Result<UserIdentity, Error>;

    /// Read balance, inventory and history as one consistent view.
    async fn snapshot(&self, identity: &UserIdentity) -> Result<AccountSnapshot, Error>;

    /// Resolve the caller and read their account in one step.
    async fn resolve_and_snapshot(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<(UserIdentity, AccountSnapshot), Error>;
}
