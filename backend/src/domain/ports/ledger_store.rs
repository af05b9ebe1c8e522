//! Driven port for durable ledger state.
//!
//! The ledger store owns balances, inventory and transfer history. Every
//! mutating method is a single atomic unit: it either commits completely or
//! leaves no trace. Implementations must re-check balances under their own
//! locks, since callers only perform advisory pre-checks.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{
    AccountSnapshot, CoinHistory, Coins, Error, InventoryEntry, ItemId, ItemKind, PurchaseQuote,
    SnapshotPart, StoredCredential, UserCreation, UserId, Username,
};

define_port_error! {
    /// Errors raised by ledger store adapters.
    pub enum LedgerStoreError {
        /// The store could not be reached or a connection could not be
        /// checked out.
        Connection { message: String } => "ledger store connection failed: {message}",
        /// A statement failed or returned unexpected data.
        Query { message: String } => "ledger store query failed: {message}",
        /// The operation did not finish before its deadline.
        Timeout { operation: String } => "ledger store operation timed out: {operation}",
        /// A referenced account does not exist.
        UnknownUser { reference: String } => "unknown user: {reference}",
        /// The requested catalog item does not exist.
        UnknownItem { item: String } => "unknown item: {item}",
        /// The locked balance cannot cover the debit.
        InsufficientFunds { balance: Coins, required: Coins } =>
            "insufficient funds: balance {balance}, required {required}",
        /// One part of a composite account read failed.
        SnapshotRead { part: SnapshotPart, message: String } =>
            "failed to read account {part}: {message}",
    }
}

impl From<LedgerStoreError> for Error {
    fn from(value: LedgerStoreError) -> Self {
        match value {
            LedgerStoreError::Connection { message } => {
                Error::service_unavailable(format!("ledger store unavailable: {message}"))
            }
            LedgerStoreError::Timeout { operation } => {
                Error::service_unavailable(format!("ledger store timed out during {operation}"))
            }
            LedgerStoreError::Query { message } => {
                Error::internal(format!("ledger store error: {message}"))
            }
            LedgerStoreError::UnknownUser { reference } => {
                Error::internal(format!("account {reference} is missing from the ledger"))
            }
            LedgerStoreError::UnknownItem { item } => {
                Error::unknown_item(format!("unknown item: {item}"))
            }
            LedgerStoreError::InsufficientFunds { balance, required } => {
                Error::insufficient_funds(format!(
                    "insufficient funds: balance {balance}, required {required}"
                ))
            }
            LedgerStoreError::SnapshotRead { part, message } => {
                Error::internal(format!("failed to read account {part}: {message}"))
            }
        }
    }
}

/// Durable ledger state.
///
/// Adapters: PostgreSQL via Diesel, and an in-memory double for tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert an account unless the username is taken.
    ///
    /// Never overwrites an existing credential. When the username already
    /// exists the result carries `created: false` and the existing id.
    async fn create_user_if_absent(
        &self,
        username: &Username,
        credential_hash: &str,
        initial_balance: Coins,
    ) -> Result<UserCreation, LedgerStoreError>;

    /// Look up the stored credential for `username`.
    async fn get_credential(
        &self,
        username: &Username,
    ) -> Result<Option<StoredCredential>, LedgerStoreError>;

    /// Read the buyer balance together with the catalog price of `item`.
    ///
    /// # Errors
    /// [`LedgerStoreError::UnknownUser`] or [`LedgerStoreError::UnknownItem`]
    /// when either side is missing.
    async fn get_balance_and_item_price(
        &self,
        user_id: UserId,
        item: &ItemKind,
    ) -> Result<PurchaseQuote, LedgerStoreError>;

    /// Debit `price` and add one unit of `item_id` to the buyer's inventory.
    ///
    /// # Errors
    /// [`LedgerStoreError::InsufficientFunds`] when the locked balance is
    /// below `price`; nothing is written in that case.
    async fn apply_purchase(
        &self,
        user_id: UserId,
        price: Coins,
        item_id: ItemId,
    ) -> Result<(), LedgerStoreError>;

    /// Current balance for `username`, or `None` when the account is absent.
    async fn get_balance(&self, username: &Username) -> Result<Option<Coins>, LedgerStoreError>;

    /// Move `amount` coins and append a history record.
    ///
    /// Both account rows are locked in ascending id order before the sender
    /// balance is re-checked.
    async fn apply_transfer(
        &self,
        from: &Username,
        to: &Username,
        amount: Coins,
    ) -> Result<(), LedgerStoreError>;

    /// Inventory ordered by item kind.
    async fn get_inventory(&self, user_id: UserId)
    -> Result<Vec<InventoryEntry>, LedgerStoreError>;

    /// Sent and received transfers, each in insertion order.
    async fn get_history(&self, user_id: UserId) -> Result<CoinHistory, LedgerStoreError>;

    /// Balance, inventory and history read from one consistent snapshot.
    ///
    /// # Errors
    /// [`LedgerStoreError::SnapshotRead`] naming the sub-read that failed.
    async fn read_account(&self, user_id: UserId) -> Result<AccountSnapshot, LedgerStoreError>;
}
