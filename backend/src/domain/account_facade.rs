//! Caller resolution and account reads for read endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::domain::ports::{AccountQuery, LedgerStore, LedgerStoreError};
use crate::domain::{
    AccountSnapshot, CredentialVerifier, Error, IdentifyError, LoginCredentials, SnapshotPart,
    UserIdentity,
};

/// Reasons an account snapshot could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    /// One sub-read failed, so no snapshot is returned.
    #[error("failed to read account {part}")]
    PartialReadFailure {
        /// The sub-read that failed.
        part: SnapshotPart,
    },
    /// The store failed before any sub-read ran.
    #[error(transparent)]
    Storage(LedgerStoreError),
}

impl From<LedgerStoreError> for SnapshotError {
    fn from(value: LedgerStoreError) -> Self {
        match value {
            LedgerStoreError::SnapshotRead { part, .. } => Self::PartialReadFailure { part },
            other => Self::Storage(other),
        }
    }
}

impl From<SnapshotError> for Error {
    fn from(value: SnapshotError) -> Self {
        match value {
            SnapshotError::PartialReadFailure { part } => {
                Error::internal(format!("failed to read account {part}"))
                    .with_details(json!({ "part": part.as_str() }))
            }
            SnapshotError::Storage(err) => err.into(),
        }
    }
}

/// Answers "who is this caller" and "what do they hold".
#[derive(Clone)]
pub struct AccountFacade<S> {
    verifier: CredentialVerifier<S>,
    store: Arc<S>,
}

impl<S> AccountFacade<S> {
    /// Create a facade sharing `store` with its own verifier.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            verifier: CredentialVerifier::new(Arc::clone(&store)),
            store,
        }
    }
}

impl<S> AccountFacade<S>
where
    S: LedgerStore,
{
    /// Re-validate `credentials` against storage.
    pub async fn resolve(&self, credentials: &LoginCredentials) -> Result<UserIdentity, IdentifyError> {
        self.verifier.authenticate(credentials).await
    }

    /// Read balance, inventory and history from one snapshot.
    ///
    /// Never returns a partially populated snapshot.
    pub async fn snapshot(&self, identity: &UserIdentity) -> Result<AccountSnapshot, SnapshotError> {
        self.store.read_account(identity.id()).await.map_err(|err| {
            debug!(user_id = %identity.id(), error = %err, "account snapshot failed");
            SnapshotError::from(err)
        })
    }
}

#[async_trait]
impl<S> AccountQuery for AccountFacade<S>
where
    S: LedgerStore,
{
    async fn resolve(&self, credentials: &LoginCredentials) -> Result<UserIdentity, Error> {
        AccountFacade::resolve(self, credentials)
            .await
            .map_err(Error::from)
    }

    async fn snapshot(&self, identity: &UserIdentity) -> Result<AccountSnapshot, Error> {
        AccountFacade::snapshot(self, identity)
            .await
            .map_err(Error::from)
    }

    async fn resolve_and_snapshot(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<(UserIdentity, AccountSnapshot), Error> {
        let identity = AccountQuery::resolve(self, credentials).await?;
        let snapshot = AccountQuery::snapshot(self, &identity).await?;
        Ok((identity, snapshot))
    }
}
