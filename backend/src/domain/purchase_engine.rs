//! Catalog purchases.
//!
//! A purchase debits the item price and credits one inventory unit in a
//! single store transaction. The balance pre-check here only avoids opening
//! that transaction when the outcome is already known.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{LedgerStore, LedgerStoreError, PurchaseCommand};
use crate::domain::{Coins, Error, ItemKind, UserIdentity};

/// Reasons a purchase is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    /// No catalog item has this kind.
    #[error("unknown item: {item}")]
    UnknownItem {
        /// Requested kind.
        item: ItemKind,
    },
    /// The buyer cannot cover the price.
    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds {
        /// Buyer balance when checked.
        balance: Coins,
        /// Item price.
        required: Coins,
    },
    /// The ledger store failed.
    #[error(transparent)]
    Storage(#[from] LedgerStoreError),
}

impl From<PurchaseError> for Error {
    fn from(value: PurchaseError) -> Self {
        match value {
            PurchaseError::UnknownItem { item } => Error::unknown_item(format!("unknown item: {item}")),
            PurchaseError::InsufficientFunds { balance, required } => {
                Error::insufficient_funds("insufficient funds")
                    .with_details(json!({ "balance": balance, "required": required }))
            }
            PurchaseError::Storage(err) => err.into(),
        }
    }
}

/// Validates and executes purchases against a [`LedgerStore`].
#[derive(Clone)]
pub struct PurchaseEngine<S> {
    store: Arc<S>,
}

impl<S> PurchaseEngine<S> {
    /// Create an engine backed by `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S> PurchaseEngine<S>
where
    S: LedgerStore,
{
    /// Buy one unit of `item` for `buyer`.
    pub async fn purchase(&self, buyer: &UserIdentity, item: &ItemKind) -> Result<(), PurchaseError> {
        let quote = self
            .store
            .get_balance_and_item_price(buyer.id(), item)
            .await
            .map_err(|err| Self::classify(err, item))?;
        if quote.balance < quote.price {
            return Err(PurchaseError::InsufficientFunds {
                balance: quote.balance,
                required: quote.price,
            });
        }

        self.store
            .apply_purchase(buyer.id(), quote.price, quote.item_id)
            .await
            .map_err(|err| Self::classify(err, item))?;

        info!(buyer = %buyer.username(), %item, price = quote.price, "item purchased");
        Ok(())
    }

    fn classify(error: LedgerStoreError, item: &ItemKind) -> PurchaseError {
        match error {
            LedgerStoreError::UnknownItem { .. } => PurchaseError::UnknownItem { item: item.clone() },
            LedgerStoreError::InsufficientFunds { balance, required } => {
                PurchaseError::InsufficientFunds { balance, required }
            }
            other => PurchaseError::Storage(other),
        }
    }
}

#[async_trait]
impl<S> PurchaseCommand for PurchaseEngine<S>
where
    S: LedgerStore,
{
    async fn buy(&self, buyer: &UserIdentity, item: &ItemKind) -> Result<(), Error> {
        self.purchase(buyer, item).await.map_err(Error::from)
    }
}
