//! Peer-to-peer coin transfers.
//!
//! Request-shape checks run before any storage read. The balance check here
//! is advisory: the ledger store repeats it under the row locks of the
//! transaction that moves the coins.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{LedgerStore, LedgerStoreError, TransferCommand};
use crate::domain::{Coins, Error, UserIdentity, Username};

/// Reasons a transfer is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    /// Sender and receiver are the same account.
    #[error("cannot transfer coins to yourself")]
    SameParty,
    /// The amount is zero or negative.
    #[error("transfer amount must be positive, got {amount}")]
    InvalidAmount {
        /// Rejected amount.
        amount: Coins,
    },
    /// The receiver account does not exist.
    #[error("unknown receiver: {username}")]
    UnknownReceiver {
        /// Receiver named in the request.
        username: Username,
    },
    /// The sender cannot cover the amount.
    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Sender balance when checked.
        balance: Coins,
        /// Amount requested.
        required: Coins,
    },
    /// The ledger store failed.
    #[error(transparent)]
    Storage(#[from] LedgerStoreError),
}

impl From<TransferError> for Error {
    fn from(value: TransferError) -> Self {
        match value {
            TransferError::SameParty => Error::invalid_request("cannot transfer coins to yourself"),
            TransferError::InvalidAmount { amount } => {
                Error::invalid_request("transfer amount must be positive")
                    .with_details(json!({ "field": "amount", "value": amount }))
            }
            TransferError::UnknownReceiver { username } => {
                Error::unknown_receiver(format!("unknown receiver: {username}"))
            }
            TransferError::InsufficientFunds { balance, required } => {
                Error::insufficient_funds("insufficient funds")
                    .with_details(json!({ "balance": balance, "required": required }))
            }
            TransferError::Storage(err) => err.into(),
        }
    }
}

/// Validates and executes transfers against a [`LedgerStore`].
#[derive(Clone)]
pub struct TransferEngine<S> {
    store: Arc<S>,
}

impl<S> TransferEngine<S> {
    /// Create an engine backed by `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> TransferEngine<S>
where
    S: LedgerStore,
{
    /// Move `amount` coins from `sender` to `receiver`.
    pub async fn transfer(
        &self,
        sender: &UserIdentity,
        receiver: &Username,
        amount: Coins,
    ) -> Result<(), TransferError> {
        if receiver == sender.username() {
            return Err(TransferError::SameParty);
        }
        if amount <= 0 {
            return Err(TransferError::InvalidAmount { amount });
        }

        if self.store.get_balance(receiver).await?.is_none() {
            return Err(TransferError::UnknownReceiver {
                username: receiver.clone(),
            });
        }
        let balance = self
            .store
            .get_balance(sender.username())
            .await?
            .ok_or_else(|| LedgerStoreError::unknown_user(sender.username().to_string()))?;
        if balance < amount {
            return Err(TransferError::InsufficientFunds {
                balance,
                required: amount,
            });
        }

        self.store
            .apply_transfer(sender.username(), receiver, amount)
            .await
            .map_err(|err| Self::classify(err, receiver))?;

        info!(
            sender = %sender.username(),
            %receiver,
            amount,
            "coins transferred"
        );
        Ok(())
    }

    fn classify(error: LedgerStoreError, receiver: &Username) -> TransferError {
        match error {
            LedgerStoreError::InsufficientFunds { balance, required } => {
                TransferError::InsufficientFunds { balance, required }
            }
            LedgerStoreError::UnknownUser { reference } if reference == receiver.as_ref() => {
                TransferError::UnknownReceiver {
                    username: receiver.clone(),
                }
            }
            other => TransferError::Storage(other),
        }
    }
}

#[async_trait]
impl<S> TransferCommand for TransferEngine<S>
where
    S: LedgerStore,
{
    async fn send_coins(
        &self,
        sender: &UserIdentity,
        receiver: &Username,
        amount: Coins,
    ) -> Result<(), Error> {
        self.transfer(sender, receiver, amount)
            .await
            .map_err(Error::from)
    }
}
