//! Outbound adapters implementing the ledger store port.
//!
//! - **persistence**: PostgreSQL via Diesel, used in production.
//! - **memory**: mutex-backed double with fault injection, used by tests and
//!   for running the HTTP surface without a database.
//!
//! Adapters translate between domain types and storage representations and
//! re-check balances under their own locks. They contain no other business
//! rules.

pub mod memory;
pub mod persistence;
