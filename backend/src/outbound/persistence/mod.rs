//! PostgreSQL persistence adapters using Diesel.
//!
//! - **Thin adapter**: [`DieselLedgerStore`] translates between Diesel rows
//!   and ledger domain types; balance rules live in the engines and are
//!   re-checked here only under row locks.
//! - **Internal models**: row structs (`models.rs`) and the schema
//!   (`schema.rs`) never leave this module.
//! - **Async pooling**: `bb8` via `diesel-async`.
//! - **Embedded migrations**: applied once at startup on a blocking
//!   connection.
//!
//! # Example
//!
//! ```ignore
//! use shop_backend::outbound::persistence::{DbPool, DieselLedgerStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/shop")).await?;
//! let store = DieselLedgerStore::new(pool);
//! ```

mod diesel_ledger_store;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_ledger_store::{DEFAULT_STORE_DEADLINE, DieselLedgerStore};
pub use migrations::{MigrationError, apply_migrations, apply_migrations_async};
pub use pool::{DbPool, PoolConfig, PoolError};
