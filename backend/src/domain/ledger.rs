//! Ledger value types shared by the engines and the storage port.
//!
//! Balances and transfer amounts are whole coins. Inventory and history rows
//! are read-only views assembled by the ledger store.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::user::{UserId, Username};

/// Whole-coin amount. Signed so that invalid requests can be represented and
/// rejected rather than silently wrapped.
pub type Coins = i64;

/// Starting balance granted to every new account unless configured otherwise.
pub const DEFAULT_INITIAL_GRANT: Coins = 1000;

/// Catalog seeded by the schema migrations, as `(kind, price)` pairs.
pub const SEEDED_CATALOG: &[(&str, Coins)] = &[
    ("t-shirt", 100),
    ("cup", 20),
    ("book", 50),
    ("pen", 10),
    ("powerbank", 200),
    ("hoody", 300),
    ("umbrella", 200),
    ("socks", 10),
    ("wallet", 50),
    ("pink-hoody", 500),
];

/// Validation errors for [`ItemKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ItemKindValidationError {
    /// Item kind was blank once trimmed.
    #[error("item kind must not be empty")]
    Empty,
}

/// Catalog item name such as `t-shirt`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemKind(String);

impl ItemKind {
    /// Validate and construct an item kind.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ItemKindValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ItemKindValidationError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for ItemKind {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ItemKind> for String {
    fn from(value: ItemKind) -> Self {
        value.0
    }
}

impl TryFrom<String> for ItemKind {
    type Error = ItemKindValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Catalog row identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(i64);

impl ItemId {
    /// Wrap a raw store identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier as stored.
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

/// Quantity of one item kind held by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    /// Item kind held.
    pub item: ItemKind,
    /// Number of units, always at least one.
    pub quantity: i32,
}

/// Transfer seen from the sender's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTransfer {
    /// Receiving account.
    pub to_user: Username,
    /// Coins moved.
    pub amount: Coins,
}

/// Transfer seen from the receiver's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedTransfer {
    /// Sending account.
    pub from_user: Username,
    /// Coins moved.
    pub amount: Coins,
}

/// Both history views for one user, each in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoinHistory {
    /// Transfers this user sent.
    pub sent: Vec<SentTransfer>,
    /// Transfers this user received.
    pub received: Vec<ReceivedTransfer>,
}

/// Consistent view of an account at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// Current balance.
    pub balance: Coins,
    /// Inventory ordered by item kind.
    pub inventory: Vec<InventoryEntry>,
    /// Transfer history.
    pub history: CoinHistory,
}

/// Balance and catalog price read ahead of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseQuote {
    /// Buyer balance at read time.
    pub balance: Coins,
    /// Unit price of the requested item.
    pub price: Coins,
    /// Catalog row to credit.
    pub item_id: ItemId,
}

/// Sub-read of an account snapshot, used to name what failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotPart {
    /// The balance read.
    Balance,
    /// The inventory read.
    Inventory,
    /// The transfer history read.
    History,
}

impl SnapshotPart {
    /// Stable lower-case name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::Inventory => "inventory",
            Self::History => "history",
        }
    }
}

impl fmt::Display for SnapshotPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a conditional account insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserCreation {
    /// `false` when the username already existed and nothing was written.
    pub created: bool,
    /// Identifier of the inserted row, or of the existing one.
    pub id: UserId,
}

/// Credential material stored for an account.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredCredential {
    /// Account identifier.
    pub id: UserId,
    /// Encoded credential hash.
    pub hash: String,
}

impl fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredential")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("t-shirt", "t-shirt")]
    #[case("  cup ", "cup")]
    fn item_kinds_are_trimmed(#[case] raw: &str, #[case] expected: &str) {
        let kind = ItemKind::new(raw).expect("valid item kind");
        assert_eq!(kind.as_ref(), expected);
    }

    #[rstest]
    fn blank_item_kinds_are_rejected() {
        assert_eq!(ItemKind::new(" "), Err(ItemKindValidationError::Empty));
    }

    #[rstest]
    fn seeded_catalog_has_unique_kinds_and_valid_prices() {
        let mut kinds: Vec<_> = SEEDED_CATALOG.iter().map(|(kind, _)| *kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), SEEDED_CATALOG.len());
        assert!(SEEDED_CATALOG.iter().all(|(_, price)| *price >= 0));
    }

    #[rstest]
    #[case(SnapshotPart::Balance, "balance")]
    #[case(SnapshotPart::Inventory, "inventory")]
    #[case(SnapshotPart::History, "history")]
    fn snapshot_parts_display_lowercase(#[case] part: SnapshotPart, #[case] expected: &str) {
        assert_eq!(part.to_string(), expected);
    }

    #[rstest]
    fn stored_credential_debug_hides_hash() {
        let credential = StoredCredential {
            id: UserId::new(1),
            hash: "$argon2id$v=19$m=19456,t=2,p=1$YWFhYWFhYWE$AAAA".to_owned(),
        };
        assert!(!format!("{credential:?}").contains("argon2id"));
    }
}
