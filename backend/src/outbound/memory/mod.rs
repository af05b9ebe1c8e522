//! In-memory ledger store with fault injection.
//!
//! Implements the `LedgerStore` port over a single mutex-guarded ledger.
//! Each operation holds the lock for its whole duration, which gives the
//! same serialisation a row lock would. Mutations work on a staged copy that
//! replaces the committed ledger only when every step succeeds, so an
//! injected fault at any stage leaves committed state untouched.
//!
//! Faults are armed per operation ([`InMemoryLedgerStore::fail_next`]), per
//! transaction stage ([`InMemoryLedgerStore::fail_at_stage`]) or per snapshot
//! part ([`InMemoryLedgerStore::fail_snapshot_part`]). All faults fire once.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ports::{LedgerStore, LedgerStoreError};
use crate::domain::{
    AccountSnapshot, CoinHistory, Coins, InventoryEntry, ItemId, ItemKind, PurchaseQuote,
    ReceivedTransfer, SEEDED_CATALOG, SentTransfer, SnapshotPart, StoredCredential, UserCreation,
    UserId, Username,
};

/// Store operations that can be failed on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOperation {
    /// [`LedgerStore::create_user_if_absent`].
    CreateUser,
    /// [`LedgerStore::get_credential`].
    GetCredential,
    /// [`LedgerStore::get_balance_and_item_price`].
    GetBalanceAndItemPrice,
    /// [`LedgerStore::apply_purchase`].
    ApplyPurchase,
    /// [`LedgerStore::get_balance`].
    GetBalance,
    /// [`LedgerStore::apply_transfer`].
    ApplyTransfer,
    /// [`LedgerStore::get_inventory`].
    GetInventory,
    /// [`LedgerStore::get_history`].
    GetHistory,
    /// [`LedgerStore::read_account`].
    ReadAccount,
}

/// Points inside a mutating transaction where a fault can be injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionStage {
    /// The locked balance was re-checked but nothing was written yet.
    AfterBalanceCheck,
    /// The payer was debited.
    AfterDebit,
    /// The transfer receiver was credited; the history row is not yet
    /// appended.
    AfterCredit,
}

#[derive(Debug, Clone)]
struct UserRow {
    username: Username,
    credential_hash: String,
    balance: Coins,
}

#[derive(Debug, Clone)]
struct ItemRow {
    id: ItemId,
    kind: ItemKind,
    price: Coins,
}

#[derive(Debug, Clone)]
struct TransferRow {
    sender: UserId,
    receiver: UserId,
    amount: Coins,
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    users: BTreeMap<UserId, UserRow>,
    names: HashMap<Username, UserId>,
    next_user_id: i64,
    items: Vec<ItemRow>,
    inventory: BTreeMap<(UserId, ItemId), i32>,
    transfers: Vec<TransferRow>,
}

impl Ledger {
    fn user(&self, id: UserId) -> Result<&UserRow, LedgerStoreError> {
        self.users
            .get(&id)
            .ok_or_else(|| LedgerStoreError::unknown_user(id.to_string()))
    }

    fn user_mut(&mut self, id: UserId) -> Result<&mut UserRow, LedgerStoreError> {
        self.users
            .get_mut(&id)
            .ok_or_else(|| LedgerStoreError::unknown_user(id.to_string()))
    }

    fn id_of(&self, username: &Username) -> Result<UserId, LedgerStoreError> {
        self.names
            .get(username)
            .copied()
            .ok_or_else(|| LedgerStoreError::unknown_user(username.to_string()))
    }

    fn username(&self, id: UserId) -> Result<Username, LedgerStoreError> {
        self.user(id).map(|row| row.username.clone())
    }

    fn inventory_of(&self, id: UserId) -> Result<Vec<InventoryEntry>, LedgerStoreError> {
        let mut entries = self
            .inventory
            .iter()
            .filter(|((owner, _), _)| *owner == id)
            .map(|((_, item_id), quantity)| {
                let item = self
                    .items
                    .iter()
                    .find(|row| row.id == *item_id)
                    .ok_or_else(|| LedgerStoreError::query(format!("dangling item {item_id:?}")))?;
                Ok(InventoryEntry {
                    item: item.kind.clone(),
                    quantity: *quantity,
                })
            })
            .collect::<Result<Vec<_>, LedgerStoreError>>()?;
        entries.sort_by(|a, b| a.item.cmp(&b.item));
        Ok(entries)
    }

    fn history_of(&self, id: UserId) -> Result<CoinHistory, LedgerStoreError> {
        let mut history = CoinHistory::default();
        for row in &self.transfers {
            if row.sender == id {
                history.sent.push(SentTransfer {
                    to_user: self.username(row.receiver)?,
                    amount: row.amount,
                });
            }
            if row.receiver == id {
                history.received.push(ReceivedTransfer {
                    from_user: self.username(row.sender)?,
                    amount: row.amount,
                });
            }
        }
        Ok(history)
    }
}

#[derive(Debug, Default)]
struct Faults {
    operations: HashMap<LedgerOperation, VecDeque<LedgerStoreError>>,
    stages: HashMap<TransactionStage, LedgerStoreError>,
    snapshot: Option<(SnapshotPart, String)>,
}

impl Faults {
    fn on_entry(&mut self, operation: LedgerOperation) -> Result<(), LedgerStoreError> {
        match self
            .operations
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn at(&mut self, stage: TransactionStage) -> Result<(), LedgerStoreError> {
        match self.stages.remove(&stage) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn on_part(&mut self, part: SnapshotPart) -> Result<(), LedgerStoreError> {
        match self.snapshot.take() {
            Some((failing, message)) if failing == part => {
                Err(LedgerStoreError::snapshot_read(part, message))
            }
            other => {
                self.snapshot = other;
                Ok(())
            }
        }
    }
}

#[derive(Debug, Default)]
struct State {
    ledger: Ledger,
    faults: Faults,
}

/// Mutex-backed [`LedgerStore`] for tests and local runs.
///
/// # Examples
/// ```
/// use shop_backend::outbound::memory::InMemoryLedgerStore;
///
/// let store = InMemoryLedgerStore::new();
/// assert_eq!(store.total_balance(), Ok(0));
/// ```
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    state: Mutex<State>,
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedgerStore {
    /// Create a store seeded with the default catalog.
    pub fn new() -> Self {
        Self::with_catalog(SEEDED_CATALOG.iter().copied())
    }

    /// Create a store seeded with a custom catalog of `(kind, price)` pairs.
    ///
    /// Blank kinds are skipped.
    pub fn with_catalog<'a>(catalog: impl IntoIterator<Item = (&'a str, Coins)>) -> Self {
        let items = catalog
            .into_iter()
            .filter_map(|(kind, price)| ItemKind::new(kind).ok().map(|kind| (kind, price)))
            .zip(1_i64..)
            .map(|((kind, price), id)| ItemRow {
                id: ItemId::new(id),
                kind,
                price,
            })
            .collect();
        Self {
            state: Mutex::new(State {
                ledger: Ledger {
                    items,
                    next_user_id: 1,
                    ..Ledger::default()
                },
                faults: Faults::default(),
            }),
        }
    }

    /// Fail the next call of `operation` with `error` before it touches state.
    ///
    /// Repeated calls queue further failures.
    pub fn fail_next(&self, operation: LedgerOperation, error: LedgerStoreError) {
        self.with_faults(|faults| {
            faults
                .operations
                .entry(operation)
                .or_default()
                .push_back(error);
        });
    }

    /// Fail the next mutating transaction that reaches `stage`.
    pub fn fail_at_stage(&self, stage: TransactionStage, error: LedgerStoreError) {
        self.with_faults(|faults| {
            faults.stages.insert(stage, error);
        });
    }

    /// Fail the `part` sub-read of the next account snapshot.
    pub fn fail_snapshot_part(&self, part: SnapshotPart, message: impl Into<String>) {
        let message = message.into();
        self.with_faults(|faults| faults.snapshot = Some((part, message)));
    }

    /// Sum of all balances.
    pub fn total_balance(&self) -> Result<Coins, LedgerStoreError> {
        self.read(|ledger| Ok(ledger.users.values().map(|row| row.balance).sum()))
    }

    /// Number of registered accounts.
    pub fn user_count(&self) -> Result<usize, LedgerStoreError> {
        self.read(|ledger| Ok(ledger.users.len()))
    }

    /// Number of transfer records.
    pub fn transfer_count(&self) -> Result<usize, LedgerStoreError> {
        self.read(|ledger| Ok(ledger.transfers.len()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, LedgerStoreError> {
        self.state
            .lock()
            .map_err(|_| LedgerStoreError::query("in-memory ledger lock poisoned"))
    }

    fn with_faults(&self, arm: impl FnOnce(&mut Faults)) {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        arm(&mut guard.faults);
    }

    fn read<T>(
        &self,
        f: impl FnOnce(&Ledger) -> Result<T, LedgerStoreError>,
    ) -> Result<T, LedgerStoreError> {
        let guard = self.lock()?;
        f(&guard.ledger)
    }

    fn run<T>(
        &self,
        operation: LedgerOperation,
        f: impl FnOnce(&mut Ledger, &mut Faults) -> Result<T, LedgerStoreError>,
    ) -> Result<T, LedgerStoreError> {
        let mut guard = self.lock()?;
        let State { ledger, faults } = &mut *guard;
        faults.on_entry(operation)?;
        f(ledger, faults)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_user_if_absent(
        &self,
        username: &Username,
        credential_hash: &str,
        initial_balance: Coins,
    ) -> Result<UserCreation, LedgerStoreError> {
        self.run(LedgerOperation::CreateUser, |ledger, _| {
            if let Some(id) = ledger.names.get(username) {
                return Ok(UserCreation {
                    created: false,
                    id: *id,
                });
            }
            if initial_balance < 0 {
                return Err(LedgerStoreError::query("balance must not be negative"));
            }
            let id = UserId::new(ledger.next_user_id);
            ledger.next_user_id += 1;
            ledger.names.insert(username.clone(), id);
            ledger.users.insert(
                id,
                UserRow {
                    username: username.clone(),
                    credential_hash: credential_hash.to_owned(),
                    balance: initial_balance,
                },
            );
            Ok(UserCreation { created: true, id })
        })
    }

    async fn get_credential(
        &self,
        username: &Username,
    ) -> Result<Option<StoredCredential>, LedgerStoreError> {
        self.run(LedgerOperation::GetCredential, |ledger, _| {
            Ok(ledger.names.get(username).and_then(|id| {
                ledger.users.get(id).map(|row| StoredCredential {
                    id: *id,
                    hash: row.credential_hash.clone(),
                })
            }))
        })
    }

    async fn get_balance_and_item_price(
        &self,
        user_id: UserId,
        item: &ItemKind,
    ) -> Result<PurchaseQuote, LedgerStoreError> {
        self.run(LedgerOperation::GetBalanceAndItemPrice, |ledger, _| {
            let balance = ledger.user(user_id)?.balance;
            let row = ledger
                .items
                .iter()
                .find(|row| row.kind == *item)
                .ok_or_else(|| LedgerStoreError::unknown_item(item.to_string()))?;
            Ok(PurchaseQuote {
                balance,
                price: row.price,
                item_id: row.id,
            })
        })
    }

    async fn apply_purchase(
        &self,
        user_id: UserId,
        price: Coins,
        item_id: ItemId,
    ) -> Result<(), LedgerStoreError> {
        self.run(LedgerOperation::ApplyPurchase, |ledger, faults| {
            let mut staged = ledger.clone();
            let buyer = staged.user_mut(user_id)?;
            if buyer.balance < price {
                return Err(LedgerStoreError::insufficient_funds(buyer.balance, price));
            }
            faults.at(TransactionStage::AfterBalanceCheck)?;
            buyer.balance -= price;
            faults.at(TransactionStage::AfterDebit)?;
            if !staged.items.iter().any(|row| row.id == item_id) {
                return Err(LedgerStoreError::unknown_item(format!("{}", item_id.as_i64())));
            }
            *staged.inventory.entry((user_id, item_id)).or_insert(0) += 1;
            *ledger = staged;
            Ok(())
        })
    }

    async fn get_balance(&self, username: &Username) -> Result<Option<Coins>, LedgerStoreError> {
        self.run(LedgerOperation::GetBalance, |ledger, _| {
            Ok(ledger
                .names
                .get(username)
                .and_then(|id| ledger.users.get(id))
                .map(|row| row.balance))
        })
    }

    async fn apply_transfer(
        &self,
        from: &Username,
        to: &Username,
        amount: Coins,
    ) -> Result<(), LedgerStoreError> {
        self.run(LedgerOperation::ApplyTransfer, |ledger, faults| {
            if amount <= 0 {
                return Err(LedgerStoreError::query("transfer amount must be positive"));
            }
            let sender = ledger.id_of(from)?;
            let receiver = ledger.id_of(to)?;
            if sender == receiver {
                return Err(LedgerStoreError::query("sender and receiver must differ"));
            }

            let mut staged = ledger.clone();
            let balance = staged.user(sender)?.balance;
            if balance < amount {
                return Err(LedgerStoreError::insufficient_funds(balance, amount));
            }
            faults.at(TransactionStage::AfterBalanceCheck)?;
            staged.user_mut(sender)?.balance -= amount;
            faults.at(TransactionStage::AfterDebit)?;
            staged.user_mut(receiver)?.balance += amount;
            faults.at(TransactionStage::AfterCredit)?;
            staged.transfers.push(TransferRow {
                sender,
                receiver,
                amount,
            });
            *ledger = staged;
            Ok(())
        })
    }

    async fn get_inventory(
        &self,
        user_id: UserId,
    ) -> Result<Vec<InventoryEntry>, LedgerStoreError> {
        self.run(LedgerOperation::GetInventory, |ledger, _| {
            ledger.inventory_of(user_id)
        })
    }

    async fn get_history(&self, user_id: UserId) -> Result<CoinHistory, LedgerStoreError> {
        self.run(LedgerOperation::GetHistory, |ledger, _| ledger.history_of(user_id))
    }

    async fn read_account(&self, user_id: UserId) -> Result<AccountSnapshot, LedgerStoreError> {
        self.run(LedgerOperation::ReadAccount, |ledger, faults| {
            faults.on_part(SnapshotPart::Balance)?;
            let balance = ledger
                .user(user_id)
                .map_err(|err| LedgerStoreError::snapshot_read(SnapshotPart::Balance, err.to_string()))?
                .balance;
            faults.on_part(SnapshotPart::Inventory)?;
            let inventory = ledger.inventory_of(user_id).map_err(|err| {
                LedgerStoreError::snapshot_read(SnapshotPart::Inventory, err.to_string())
            })?;
            faults.on_part(SnapshotPart::History)?;
            let history = ledger.history_of(user_id).map_err(|err| {
                LedgerStoreError::snapshot_read(SnapshotPart::History, err.to_string())
            })?;
            Ok(AccountSnapshot {
                balance,
                inventory,
                history,
            })
        })
    }
}

#[cfg(test)]
mod tests;
