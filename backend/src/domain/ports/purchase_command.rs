//! Driving port for catalog purchases.

use async_trait::async_trait;

use crate::domain::{Error, ItemKind, UserIdentity};

/// Domain use-case port for buying one unit of a catalog item.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseCommand: Send + Sync {
    /// Debit the item price from `buyer` and credit one unit to their
    /// inventory.
    async fn buy(&self, buyer: &UserIdentity, item: &ItemKind) -> Result<(), Error>;
}
