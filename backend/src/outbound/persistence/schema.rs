//! Diesel table definitions for the ledger schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` when a migration changes a table.

diesel::table! {
    /// Accounts with their credential and coin balance.
    users (id) {
        id -> Int8,
        /// Unique login name.
        username -> Varchar,
        /// Encoded salted credential hash.
        credential_hash -> Text,
        /// Coin balance, constrained to be non-negative.
        balance -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Fixed catalog seeded by migrations.
    items (id) {
        id -> Int8,
        kind -> Varchar,
        price -> Int8,
    }
}

diesel::table! {
    /// One row per (user, item) pair; quantities accumulate.
    inventory (id) {
        id -> Int8,
        user_id -> Int8,
        item_id -> Int8,
        quantity -> Int4,
    }
}

diesel::table! {
    /// Append-only transfer history. `id` gives insertion order.
    transfers (id) {
        id -> Int8,
        sender_id -> Int8,
        receiver_id -> Int8,
        amount -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(inventory -> users (user_id));
diesel::joinable!(inventory -> items (item_id));

diesel::allow_tables_to_appear_in_same_query!(inventory, items, transfers, users);
