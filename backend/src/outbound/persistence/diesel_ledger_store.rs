//! PostgreSQL-backed ledger store.
//!
//! Each mutating operation runs in one transaction: lock the affected user
//! rows with `SELECT ... FOR UPDATE`, re-check the balance, write, commit.
//! Transfers lock both rows in ascending id order. Account snapshots read
//! every part inside one read-only `REPEATABLE READ` transaction.
//!
//! Every operation, pool checkout included, runs under a deadline. When the
//! deadline fires the in-flight future is dropped before commit; the pool
//! then discards the connection because its transaction is still open.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{LedgerStore, LedgerStoreError};
use crate::domain::{
    AccountSnapshot, CoinHistory, Coins, InventoryEntry, ItemId, ItemKind, PurchaseQuote,
    ReceivedTransfer, SentTransfer, SnapshotPart, StoredCredential, UserCreation, UserId, Username,
};

use super::models::{CredentialRow, NewInventoryRow, NewTransferRow, NewUserRow};
use super::pool::{DbPool, PoolError};
use super::schema::{inventory, items, transfers, users};

/// Deadline applied to each store operation unless configured otherwise.
pub const DEFAULT_STORE_DEADLINE: Duration = Duration::from_secs(5);

/// Failure inside a transaction body.
#[derive(Debug)]
enum TxError {
    Diesel(diesel::result::Error),
    Ledger(LedgerStoreError),
    Part(SnapshotPart, diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(value: diesel::result::Error) -> Self {
        Self::Diesel(value)
    }
}

impl From<LedgerStoreError> for TxError {
    fn from(value: LedgerStoreError) -> Self {
        Self::Ledger(value)
    }
}

fn map_pool_error(error: PoolError) -> LedgerStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            LedgerStoreError::connection(message)
        }
    }
}

fn map_diesel_error(error: diesel::result::Error) -> LedgerStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection | DatabaseErrorKind::UnableToSendCommand,
            info,
        ) => LedgerStoreError::connection(info.message().to_owned()),
        DieselError::BrokenTransactionManager => {
            LedgerStoreError::connection("connection left in a broken transaction")
        }
        DieselError::DatabaseError(_, info) => LedgerStoreError::query(info.message().to_owned()),
        other => LedgerStoreError::query(other.to_string()),
    }
}

fn map_tx_error(error: TxError) -> LedgerStoreError {
    match error {
        TxError::Diesel(error) => map_diesel_error(error),
        TxError::Ledger(error) => error,
        TxError::Part(part, error) => {
            let message = map_diesel_error(error).to_string();
            LedgerStoreError::snapshot_read(part, message)
        }
    }
}

fn username_from_row(raw: String) -> Result<Username, LedgerStoreError> {
    Username::new(&raw)
        .map_err(|err| LedgerStoreError::query(format!("stored username {raw:?}: {err}")))
}

fn item_kind_from_row(raw: String) -> Result<ItemKind, LedgerStoreError> {
    ItemKind::new(&raw)
        .map_err(|err| LedgerStoreError::query(format!("stored item kind {raw:?}: {err}")))
}

async fn load_inventory(
    conn: &mut AsyncPgConnection,
    user_id: i64,
) -> Result<Vec<(String, i32)>, diesel::result::Error> {
    inventory::table
        .inner_join(items::table)
        .filter(inventory::user_id.eq(user_id))
        .order_by(items::kind.asc())
        .select((items::kind, inventory::quantity))
        .load(conn)
        .await
}

type HistoryRows = (Vec<(String, i64)>, Vec<(String, i64)>);

async fn load_history(
    conn: &mut AsyncPgConnection,
    user_id: i64,
) -> Result<HistoryRows, diesel::result::Error> {
    let sent = transfers::table
        .inner_join(users::table.on(users::id.eq(transfers::receiver_id)))
        .filter(transfers::sender_id.eq(user_id))
        .order_by(transfers::id.asc())
        .select((users::username, transfers::amount))
        .load(conn)
        .await?;
    let received = transfers::table
        .inner_join(users::table.on(users::id.eq(transfers::sender_id)))
        .filter(transfers::receiver_id.eq(user_id))
        .order_by(transfers::id.asc())
        .select((users::username, transfers::amount))
        .load(conn)
        .await?;
    Ok((sent, received))
}

fn inventory_from_rows(rows: Vec<(String, i32)>) -> Result<Vec<InventoryEntry>, LedgerStoreError> {
    rows.into_iter()
        .map(|(kind, quantity)| {
            Ok(InventoryEntry {
                item: item_kind_from_row(kind)?,
                quantity,
            })
        })
        .collect()
}

fn history_from_rows((sent, received): HistoryRows) -> Result<CoinHistory, LedgerStoreError> {
    let sent = sent
        .into_iter()
        .map(|(name, amount)| {
            Ok(SentTransfer {
                to_user: username_from_row(name)?,
                amount,
            })
        })
        .collect::<Result<_, LedgerStoreError>>()?;
    let received = received
        .into_iter()
        .map(|(name, amount)| {
            Ok(ReceivedTransfer {
                from_user: username_from_row(name)?,
                amount,
            })
        })
        .collect::<Result<_, LedgerStoreError>>()?;
    Ok(CoinHistory { sent, received })
}

/// Diesel-backed implementation of [`LedgerStore`].
#[derive(Clone)]
pub struct DieselLedgerStore {
    pool: DbPool,
    deadline: Duration,
}

impl DieselLedgerStore {
    /// Create a store over `pool` using [`DEFAULT_STORE_DEADLINE`].
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use std::time::Duration;
    /// use shop_backend::outbound::persistence::{DbPool, DieselLedgerStore, PoolConfig};
    ///
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let pool = DbPool::new(PoolConfig::new("postgres://localhost/shop")).await?;
    /// let store = DieselLedgerStore::new(pool).with_deadline(Duration::from_secs(2));
    /// # let _ = store;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            deadline: DEFAULT_STORE_DEADLINE,
        }
    }

    /// Override the per-operation deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    async fn within<T, F>(&self, operation: &'static str, fut: F) -> Result<T, LedgerStoreError>
    where
        F: Future<Output = Result<T, LedgerStoreError>>,
    {
        if let Ok(result) = tokio::time::timeout(self.deadline, fut).await {
            result
        } else {
            debug!(operation, deadline = ?self.deadline, "ledger store deadline expired");
            Err(LedgerStoreError::timeout(operation))
        }
    }

    async fn create_user_inner(
        &self,
        username: &Username,
        credential_hash: &str,
        initial_balance: Coins,
    ) -> Result<UserCreation, LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewUserRow {
            username: username.as_ref(),
            credential_hash,
            balance: initial_balance,
        };

        let inserted: Option<i64> = diesel::insert_into(users::table)
            .values(&row)
            .on_conflict(users::username)
            .do_nothing()
            .returning(users::id)
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        if let Some(id) = inserted {
            return Ok(UserCreation {
                created: true,
                id: UserId::new(id),
            });
        }

        let existing: i64 = users::table
            .filter(users::username.eq(username.as_ref()))
            .select(users::id)
            .first(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(UserCreation {
            created: false,
            id: UserId::new(existing),
        })
    }

    async fn get_credential_inner(
        &self,
        username: &Username,
    ) -> Result<Option<StoredCredential>, LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CredentialRow> = users::table
            .filter(users::username.eq(username.as_ref()))
            .select(CredentialRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(|row| StoredCredential {
            id: UserId::new(row.id),
            hash: row.credential_hash,
        }))
    }

    async fn quote_inner(
        &self,
        user_id: UserId,
        item: &ItemKind,
    ) -> Result<PurchaseQuote, LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let balance: i64 = users::table
            .find(user_id.as_i64())
            .select(users::balance)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .ok_or_else(|| LedgerStoreError::unknown_user(user_id.to_string()))?;
        let (item_id, price): (i64, i64) = items::table
            .filter(items::kind.eq(item.as_ref()))
            .select((items::id, items::price))
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .ok_or_else(|| LedgerStoreError::unknown_item(item.to_string()))?;
        Ok(PurchaseQuote {
            balance,
            price,
            item_id: ItemId::new(item_id),
        })
    }

    async fn apply_purchase_inner(
        &self,
        user_id: UserId,
        price: Coins,
        item_id: ItemId,
    ) -> Result<(), LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let user_id = user_id.as_i64();
        let item_id = item_id.as_i64();

        conn.transaction::<_, TxError, _>(|conn| {
            async move {
                let balance: i64 = users::table
                    .find(user_id)
                    .select(users::balance)
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| LedgerStoreError::unknown_user(user_id.to_string()))?;
                if balance < price {
                    return Err(LedgerStoreError::insufficient_funds(balance, price).into());
                }

                diesel::update(users::table.find(user_id))
                    .set(users::balance.eq(users::balance - price))
                    .execute(conn)
                    .await?;
                diesel::insert_into(inventory::table)
                    .values(&NewInventoryRow {
                        user_id,
                        item_id,
                        quantity: 1,
                    })
                    .on_conflict((inventory::user_id, inventory::item_id))
                    .do_update()
                    .set(inventory::quantity.eq(inventory::quantity + 1))
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_tx_error)
    }

    async fn get_balance_inner(&self, username: &Username) -> Result<Option<Coins>, LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        users::table
            .filter(users::username.eq(username.as_ref()))
            .select(users::balance)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)
    }

    async fn apply_transfer_inner(
        &self,
        from: &Username,
        to: &Username,
        amount: Coins,
    ) -> Result<(), LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let from_name = from.to_string();
        let to_name = to.to_string();

        conn.transaction::<_, TxError, _>(|conn| {
            async move {
                let sender = Self::resolve_id(conn, &from_name).await?;
                let receiver = Self::resolve_id(conn, &to_name).await?;
                if sender == receiver {
                    return Err(LedgerStoreError::query("sender and receiver must differ").into());
                }

                let (low, high) = if sender < receiver {
                    (sender, receiver)
                } else {
                    (receiver, sender)
                };
                let low_balance = Self::lock_balance(conn, low).await?;
                let high_balance = Self::lock_balance(conn, high).await?;
                let balance = if sender == low { low_balance } else { high_balance };
                if balance < amount {
                    return Err(LedgerStoreError::insufficient_funds(balance, amount).into());
                }

                diesel::update(users::table.find(sender))
                    .set(users::balance.eq(users::balance - amount))
                    .execute(conn)
                    .await?;
                diesel::update(users::table.find(receiver))
                    .set(users::balance.eq(users::balance + amount))
                    .execute(conn)
                    .await?;
                diesel::insert_into(transfers::table)
                    .values(&NewTransferRow {
                        sender_id: sender,
                        receiver_id: receiver,
                        amount,
                    })
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_tx_error)
    }

    async fn resolve_id(conn: &mut AsyncPgConnection, username: &str) -> Result<i64, TxError> {
        users::table
            .filter(users::username.eq(username))
            .select(users::id)
            .first(conn)
            .await
            .optional()?
            .ok_or_else(|| LedgerStoreError::unknown_user(username).into())
    }

    async fn lock_balance(conn: &mut AsyncPgConnection, user_id: i64) -> Result<i64, TxError> {
        users::table
            .find(user_id)
            .select(users::balance)
            .for_update()
            .first(conn)
            .await
            .map_err(TxError::from)
    }

    async fn read_account_inner(&self, user_id: UserId) -> Result<AccountSnapshot, LedgerStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let id = user_id.as_i64();

        let (balance, inventory_rows, history_rows) = conn
            .build_transaction()
            .read_only()
            .repeatable_read()
            .run::<_, TxError, _>(|conn| {
                async move {
                    let balance: i64 = users::table
                        .find(id)
                        .select(users::balance)
                        .first(conn)
                        .await
                        .map_err(|err| TxError::Part(SnapshotPart::Balance, err))?;
                    let inventory_rows = load_inventory(conn, id)
                        .await
                        .map_err(|err| TxError::Part(SnapshotPart::Inventory, err))?;
                    let history_rows = load_history(conn, id)
                        .await
                        .map_err(|err| TxError::Part(SnapshotPart::History, err))?;
                    Ok((balance, inventory_rows, history_rows))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx_error)?;

        let inventory = inventory_from_rows(inventory_rows).map_err(|err| {
            LedgerStoreError::snapshot_read(SnapshotPart::Inventory, err.to_string())
        })?;
        let history = history_from_rows(history_rows).map_err(|err| {
            LedgerStoreError::snapshot_read(SnapshotPart::History, err.to_string())
        })?;
        Ok(AccountSnapshot {
            balance,
            inventory,
            history,
        })
    }
}

#[async_trait]
impl LedgerStore for DieselLedgerStore {
    async fn create_user_if_absent(
        &self,
        username: &Username,
        credential_hash: &str,
        initial_balance: Coins,
    ) -> Result<UserCreation, LedgerStoreError> {
        self.within(
            "create_user_if_absent",
            self.create_user_inner(username, credential_hash, initial_balance),
        )
        .await
    }

    async fn get_credential(
        &self,
        username: &Username,
    ) -> Result<Option<StoredCredential>, LedgerStoreError> {
        self.within("get_credential", self.get_credential_inner(username))
            .await
    }

    async fn get_balance_and_item_price(
        &self,
        user_id: UserId,
        item: &ItemKind,
    ) -> Result<PurchaseQuote, LedgerStoreError> {
        self.within("get_balance_and_item_price", self.quote_inner(user_id, item))
            .await
    }

    async fn apply_purchase(
        &self,
        user_id: UserId,
        price: Coins,
        item_id: ItemId,
    ) -> Result<(), LedgerStoreError> {
        self.within(
            "apply_purchase",
            self.apply_purchase_inner(user_id, price, item_id),
        )
        .await
    }

    async fn get_balance(&self, username: &Username) -> Result<Option<Coins>, LedgerStoreError> {
        self.within("get_balance", self.get_balance_inner(username))
            .await
    }

    async fn apply_transfer(
        &self,
        from: &Username,
        to: &Username,
        amount: Coins,
    ) -> Result<(), LedgerStoreError> {
        self.within("apply_transfer", self.apply_transfer_inner(from, to, amount))
            .await
    }

    async fn get_inventory(
        &self,
        user_id: UserId,
    ) -> Result<Vec<InventoryEntry>, LedgerStoreError> {
        self.within("get_inventory", async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let rows = load_inventory(&mut conn, user_id.as_i64())
                .await
                .map_err(map_diesel_error)?;
            inventory_from_rows(rows)
        })
        .await
    }

    async fn get_history(&self, user_id: UserId) -> Result<CoinHistory, LedgerStoreError> {
        self.within("get_history", async {
            let mut conn = self.pool.get().await.map_err(map_pool_error)?;
            let rows = load_history(&mut conn, user_id.as_i64())
                .await
                .map_err(map_diesel_error)?;
            history_from_rows(rows)
        })
        .await
    }

    async fn read_account(&self, user_id: UserId) -> Result<AccountSnapshot, LedgerStoreError> {
        self.within("read_account", self.read_account_inner(user_id))
            .await
    }
}
