//! Internal Diesel row structs for ledger writes.
//!
//! These types never leave the persistence layer. Reads select tuples
//! directly and convert them into domain values in the store adapter.

use diesel::prelude::*;

use super::schema::{inventory, transfers, users};

/// Insertable struct for registering an account.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub username: &'a str,
    pub credential_hash: &'a str,
    pub balance: i64,
}

/// Insertable struct for the first unit of an item in an inventory.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = inventory)]
pub(crate) struct NewInventoryRow {
    pub user_id: i64,
    pub item_id: i64,
    pub quantity: i32,
}

/// Insertable struct for a transfer history record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = transfers)]
pub(crate) struct NewTransferRow {
    pub sender_id: i64,
    pub receiver_id: i64,
    pub amount: i64,
}

/// Row struct for reading a stored credential.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CredentialRow {
    pub id: i64,
    pub credential_hash: String,
}
