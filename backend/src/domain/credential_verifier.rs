//! Credential verification and first-use registration.
//!
//! [`CredentialVerifier::identify`] is the sign-in path: unknown usernames are
//! registered with the initial grant. [`CredentialVerifier::authenticate`] is
//! the re-validation path used on every authorised request and never creates
//! accounts.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::credential_hash::{hash_secret, verify_secret};
use crate::domain::ports::{LedgerStore, LedgerStoreError, LoginService};
use crate::domain::{
    Coins, CredentialHashError, DEFAULT_INITIAL_GRANT, Error, LoginCredentials, StoredCredential,
    UserIdentity,
};

/// Verified caller together with whether this call created the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    /// Trusted identity.
    pub identity: UserIdentity,
    /// `true` when the account was registered by this call.
    pub fresh: bool,
}

/// Failures raised while verifying credentials.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifyError {
    /// Unknown username on re-validation, or a secret mismatch.
    #[error("invalid credentials")]
    Unauthorized,
    /// The stored credential could not be decoded.
    #[error("stored credential is unreadable: {0}")]
    CorruptCredential(#[from] CredentialHashError),
    /// The secret could not be hashed for a new account.
    #[error("credential hashing failed: {0}")]
    Hashing(CredentialHashError),
    /// The ledger store failed.
    #[error(transparent)]
    Storage(#[from] LedgerStoreError),
}

impl From<IdentifyError> for Error {
    fn from(value: IdentifyError) -> Self {
        match value {
            IdentifyError::Unauthorized => Error::unauthorized("invalid credentials"),
            IdentifyError::CorruptCredential(err) => {
                Error::internal(format!("stored credential is unreadable: {err}"))
            }
            IdentifyError::Hashing(err) => {
                Error::internal(format!("credential hashing failed: {err}"))
            }
            IdentifyError::Storage(err) => err.into(),
        }
    }
}

/// Resolves username/secret pairs to trusted identities.
#[derive(Clone)]
pub struct CredentialVerifier<S> {
    store: Arc<S>,
    initial_grant: Coins,
}

impl<S> CredentialVerifier<S> {
    /// Create a verifier granting [`DEFAULT_INITIAL_GRANT`] to new accounts.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            initial_grant: DEFAULT_INITIAL_GRANT,
        }
    }

    /// Override the balance granted to new accounts.
    #[must_use]
    pub fn with_initial_grant(mut self, initial_grant: Coins) -> Self {
        self.initial_grant = initial_grant;
        self
    }
}

impl<S> CredentialVerifier<S>
where
    S: LedgerStore,
{
    /// Sign in, registering the account on first use.
    ///
    /// Concurrent first-use calls for one username create exactly one
    /// account; the losers authenticate against the winner's credential.
    pub async fn identify(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<Identification, IdentifyError> {
        let username = credentials.username();
        if let Some(stored) = self.store.get_credential(username).await? {
            let identity = Self::check(credentials, &stored)?;
            return Ok(Identification {
                identity,
                fresh: false,
            });
        }

        let hash = hash_secret(credentials.secret()).map_err(IdentifyError::Hashing)?;
        let creation = self
            .store
            .create_user_if_absent(username, &hash, self.initial_grant)
            .await?;
        if creation.created {
            info!(user_id = %creation.id, %username, grant = self.initial_grant, "registered account");
            return Ok(Identification {
                identity: UserIdentity::new(creation.id, username.clone()),
                fresh: true,
            });
        }

        // Lost a registration race; the winner's credential is authoritative.
        let stored = self
            .store
            .get_credential(username)
            .await?
            .ok_or_else(|| LedgerStoreError::unknown_user(username.to_string()))?;
        let identity = Self::check(credentials, &stored)?;
        Ok(Identification {
            identity,
            fresh: false,
        })
    }

    /// Re-validate credentials for an existing account.
    pub async fn authenticate(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<UserIdentity, IdentifyError> {
        let Some(stored) = self.store.get_credential(credentials.username()).await? else {
            warn!(username = %credentials.username(), "credential for unknown account");
            return Err(IdentifyError::Unauthorized);
        };
        Self::check(credentials, &stored)
    }

    fn check(
        credentials: &LoginCredentials,
        stored: &StoredCredential,
    ) -> Result<UserIdentity, IdentifyError> {
        if verify_secret(credentials.secret(), &stored.hash)? {
            Ok(UserIdentity::new(stored.id, credentials.username().clone()))
        } else {
            warn!(username = %credentials.username(), "credential mismatch");
            Err(IdentifyError::Unauthorized)
        }
    }
}

#[async_trait]
impl<S> LoginService for CredentialVerifier<S>
where
    S: LedgerStore,
{
    async fn identify(&self, credentials: &LoginCredentials) -> Result<Identification, Error> {
        CredentialVerifier::identify(self, credentials)
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
#[path = "credential_verifier_tests.rs"]
mod tests;
