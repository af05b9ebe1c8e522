//! Tests for the in-memory ledger store.

use super::*;
use rstest::{fixture, rstest};

const STUB_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$YWFhYWFhYWE$AAAA";

fn name(raw: &str) -> Username {
    Username::new(raw).expect("valid username")
}

fn kind(raw: &str) -> ItemKind {
    ItemKind::new(raw).expect("valid item kind")
}

async fn register(store: &InMemoryLedgerStore, username: &str, balance: Coins) -> UserId {
    store
        .create_user_if_absent(&name(username), STUB_HASH, balance)
        .await
        .expect("create user")
        .id
}

#[fixture]
fn store() -> InMemoryLedgerStore {
    InMemoryLedgerStore::new()
}

#[rstest]
#[tokio::test]
async fn create_is_conditional_and_keeps_first_credential(store: InMemoryLedgerStore) {
    let first = store
        .create_user_if_absent(&name("alice"), "first", 1000)
        .await
        .expect("first create");
    let second = store
        .create_user_if_absent(&name("alice"), "second", 5)
        .await
        .expect("second create");

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.id, second.id);
    let stored = store
        .get_credential(&name("alice"))
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(stored.hash, "first");
    assert_eq!(store.get_balance(&name("alice")).await, Ok(Some(1000)));
}

#[rstest]
#[tokio::test]
async fn purchase_quote_reports_missing_parts(store: InMemoryLedgerStore) {
    let id = register(&store, "alice", 10).await;

    let missing_item = store
        .get_balance_and_item_price(id, &kind("spaceship"))
        .await
        .expect_err("unknown item");
    assert!(matches!(missing_item, LedgerStoreError::UnknownItem { .. }));

    let missing_user = store
        .get_balance_and_item_price(UserId::new(999), &kind("cup"))
        .await
        .expect_err("unknown user");
    assert!(matches!(missing_user, LedgerStoreError::UnknownUser { .. }));
}

#[rstest]
#[tokio::test]
async fn purchases_accumulate_inventory_ordered_by_kind(store: InMemoryLedgerStore) {
    let id = register(&store, "alice", 1000).await;
    for item in ["pen", "cup", "pen"] {
        let quote = store
            .get_balance_and_item_price(id, &kind(item))
            .await
            .expect("quote");
        store
            .apply_purchase(id, quote.price, quote.item_id)
            .await
            .expect("purchase");
    }

    let inventory = store.get_inventory(id).await.expect("inventory");
    assert_eq!(
        inventory,
        vec![
            InventoryEntry {
                item: kind("cup"),
                quantity: 1
            },
            InventoryEntry {
                item: kind("pen"),
                quantity: 2
            },
        ]
    );
    assert_eq!(store.get_balance(&name("alice")).await, Ok(Some(960)));
}

#[rstest]
#[tokio::test]
async fn locked_purchase_check_rejects_overdraft(store: InMemoryLedgerStore) {
    let id = register(&store, "alice", 50).await;
    let err = store
        .apply_purchase(id, 100, ItemId::new(1))
        .await
        .expect_err("overdraft");
    assert_eq!(err, LedgerStoreError::insufficient_funds(50_i64, 100_i64));
}

#[rstest]
#[case(TransactionStage::AfterBalanceCheck)]
#[case(TransactionStage::AfterDebit)]
#[tokio::test]
async fn purchase_fault_rolls_back(store: InMemoryLedgerStore, #[case] stage: TransactionStage) {
    let id = register(&store, "alice", 1000).await;
    store.fail_at_stage(stage, LedgerStoreError::connection("reset"));

    let err = store
        .apply_purchase(id, 100, ItemId::new(1))
        .await
        .expect_err("injected fault");
    assert_eq!(err, LedgerStoreError::connection("reset"));
    assert_eq!(store.get_balance(&name("alice")).await, Ok(Some(1000)));
    assert_eq!(store.get_inventory(id).await, Ok(Vec::new()));
}

#[rstest]
#[case(TransactionStage::AfterBalanceCheck)]
#[case(TransactionStage::AfterDebit)]
#[case(TransactionStage::AfterCredit)]
#[tokio::test]
async fn transfer_fault_rolls_back(store: InMemoryLedgerStore, #[case] stage: TransactionStage) {
    register(&store, "alice", 1000).await;
    register(&store, "bob", 1000).await;
    store.fail_at_stage(stage, LedgerStoreError::query("disk full"));

    store
        .apply_transfer(&name("alice"), &name("bob"), 200)
        .await
        .expect_err("injected fault");

    assert_eq!(store.get_balance(&name("alice")).await, Ok(Some(1000)));
    assert_eq!(store.get_balance(&name("bob")).await, Ok(Some(1000)));
    assert_eq!(store.transfer_count(), Ok(0));

    store
        .apply_transfer(&name("alice"), &name("bob"), 200)
        .await
        .expect("fault fires once");
    assert_eq!(store.get_balance(&name("alice")).await, Ok(Some(800)));
}

#[rstest]
#[tokio::test]
async fn transfer_to_missing_user_names_the_reference(store: InMemoryLedgerStore) {
    register(&store, "alice", 1000).await;
    let err = store
        .apply_transfer(&name("alice"), &name("ghost"), 1)
        .await
        .expect_err("unknown receiver");
    assert_eq!(err, LedgerStoreError::unknown_user("ghost"));
}

#[rstest]
#[tokio::test]
async fn history_views_keep_insertion_order(store: InMemoryLedgerStore) {
    let alice = register(&store, "alice", 1000).await;
    register(&store, "bob", 1000).await;
    register(&store, "carol", 1000).await;

    store
        .apply_transfer(&name("alice"), &name("bob"), 5)
        .await
        .expect("first");
    store
        .apply_transfer(&name("carol"), &name("alice"), 7)
        .await
        .expect("second");
    store
        .apply_transfer(&name("alice"), &name("carol"), 3)
        .await
        .expect("third");

    let history = store.get_history(alice).await.expect("history");
    assert_eq!(
        history.sent,
        vec![
            SentTransfer {
                to_user: name("bob"),
                amount: 5
            },
            SentTransfer {
                to_user: name("carol"),
                amount: 3
            },
        ]
    );
    assert_eq!(
        history.received,
        vec![ReceivedTransfer {
            from_user: name("carol"),
            amount: 7
        }]
    );
}

#[rstest]
#[tokio::test]
async fn operation_faults_fire_once_in_order(store: InMemoryLedgerStore) {
    store.fail_next(LedgerOperation::GetBalance, LedgerStoreError::timeout("get_balance"));
    store.fail_next(LedgerOperation::GetBalance, LedgerStoreError::connection("gone"));

    assert_eq!(
        store.get_balance(&name("alice")).await,
        Err(LedgerStoreError::timeout("get_balance"))
    );
    assert_eq!(
        store.get_balance(&name("alice")).await,
        Err(LedgerStoreError::connection("gone"))
    );
    assert_eq!(store.get_balance(&name("alice")).await, Ok(None));
}

#[rstest]
#[case(SnapshotPart::Balance)]
#[case(SnapshotPart::Inventory)]
#[case(SnapshotPart::History)]
#[tokio::test]
async fn snapshot_fault_names_part(store: InMemoryLedgerStore, #[case] part: SnapshotPart) {
    let id = register(&store, "alice", 1000).await;
    store.fail_snapshot_part(part, "connection reset");

    let err = store.read_account(id).await.expect_err("partial read");
    assert_eq!(err, LedgerStoreError::snapshot_read(part, "connection reset"));

    let snapshot = store.read_account(id).await.expect("fault cleared");
    assert_eq!(snapshot.balance, 1000);
}

#[rstest]
fn custom_catalog_skips_blank_kinds() {
    let store = InMemoryLedgerStore::with_catalog([("hat", 5), ("  ", 1)]);
    let count = store.read(|ledger| Ok(ledger.items.len()));
    assert_eq!(count, Ok(1));
}
