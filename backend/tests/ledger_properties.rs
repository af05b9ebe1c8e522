//! Ledger invariants under concurrency and injected faults.

use std::sync::Arc;

use rstest::rstest;
use shop_backend::domain::ports::LedgerStoreError;
use shop_backend::domain::{
    AccountFacade, CredentialVerifier, ItemKind, LoginCredentials, PurchaseEngine, PurchaseError,
    TransferEngine, TransferError, UserIdentity, Username,
};
use shop_backend::outbound::memory::{InMemoryLedgerStore, TransactionStage};
use tokio::task::JoinSet;

fn store() -> Arc<InMemoryLedgerStore> {
    Arc::new(InMemoryLedgerStore::new())
}

async fn sign_in(store: &Arc<InMemoryLedgerStore>, username: &str) -> UserIdentity {
    let credentials = LoginCredentials::try_from_parts(username, "pw").expect("credentials");
    CredentialVerifier::new(Arc::clone(store))
        .identify(&credentials)
        .await
        .expect("sign in")
        .identity
}

async fn balance(store: &Arc<InMemoryLedgerStore>, who: &UserIdentity) -> i64 {
    AccountFacade::new(Arc::clone(store))
        .snapshot(who)
        .await
        .expect("snapshot")
        .balance
}

fn kind(raw: &str) -> ItemKind {
    ItemKind::new(raw).expect("item kind")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_spending_never_overdraws() {
    let store = store();
    let alice = sign_in(&store, "alice").await;
    sign_in(&store, "bob").await;
    let transfers = Arc::new(TransferEngine::new(Arc::clone(&store)));
    let purchases = Arc::new(PurchaseEngine::new(Arc::clone(&store)));

    let mut tasks = JoinSet::new();
    for i in 0..40 {
        let alice = alice.clone();
        if i % 2 == 0 {
            let transfers = Arc::clone(&transfers);
            tasks.spawn(async move {
                let receiver = Username::new("bob").expect("username");
                match transfers.transfer(&alice, &receiver, 100).await {
                    Ok(()) => (100, 0),
                    Err(TransferError::InsufficientFunds { .. }) => (0, 0),
                    Err(other) => panic!("unexpected transfer failure: {other}"),
                }
            });
        } else {
            let purchases = Arc::clone(&purchases);
            tasks.spawn(async move {
                match purchases.purchase(&alice, &kind("powerbank")).await {
                    Ok(()) => (0, 200),
                    Err(PurchaseError::InsufficientFunds { .. }) => (0, 0),
                    Err(other) => panic!("unexpected purchase failure: {other}"),
                }
            });
        }
    }

    let (mut sent, mut spent) = (0, 0);
    while let Some(outcome) = tasks.join_next().await {
        let (transferred, paid) = outcome.expect("task completes");
        sent += transferred;
        spent += paid;
    }

    let remaining = balance(&store, &alice).await;
    assert!(remaining >= 0, "balance went negative: {remaining}");
    assert_eq!(remaining, 1000 - sent - spent);
    assert_eq!(store.total_balance(), Ok(2000 - spent));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposing_transfers_conserve_coins() {
    let store = store();
    let alice = sign_in(&store, "alice").await;
    let bob = sign_in(&store, "bob").await;
    let engine = Arc::new(TransferEngine::new(Arc::clone(&store)));

    let mut tasks = JoinSet::new();
    for i in 0..50 {
        let engine = Arc::clone(&engine);
        let (from, to) = if i % 2 == 0 {
            (alice.clone(), "bob")
        } else {
            (bob.clone(), "alice")
        };
        tasks.spawn(async move {
            let to = Username::new(to).expect("username");
            match engine.transfer(&from, &to, 37).await {
                Ok(()) => 1_usize,
                Err(TransferError::InsufficientFunds { .. }) => 0,
                Err(other) => panic!("unexpected transfer failure: {other}"),
            }
        });
    }
    let mut completed = 0;
    while let Some(done) = tasks.join_next().await {
        completed += done.expect("task completes");
    }

    assert!(completed > 0, "no transfer went through");
    assert_eq!(store.transfer_count(), Ok(completed));
    assert_eq!(store.total_balance(), Ok(2000));
    assert!(balance(&store, &alice).await >= 0);
    assert!(balance(&store, &bob).await >= 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_sign_in_registers_once() {
    let store = store();
    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let store = Arc::clone(&store);
        tasks.spawn(async move {
            let credentials = LoginCredentials::try_from_parts("carol", "pw").expect("credentials");
            CredentialVerifier::new(store)
                .identify(&credentials)
                .await
                .expect("sign in")
        });
    }

    let mut outcomes = Vec::new();
    while let Some(done) = tasks.join_next().await {
        outcomes.push(done.expect("task completes"));
    }

    assert_eq!(store.user_count(), Ok(1));
    assert_eq!(outcomes.iter().filter(|o| o.fresh).count(), 1);
    let first = outcomes[0].identity.id();
    assert!(outcomes.iter().all(|o| o.identity.id() == first));
    assert_eq!(store.total_balance(), Ok(1000));
}

#[rstest]
#[case(TransactionStage::AfterBalanceCheck)]
#[case(TransactionStage::AfterDebit)]
#[tokio::test]
async fn failed_purchase_leaves_no_trace(#[case] stage: TransactionStage) {
    let store = store();
    let alice = sign_in(&store, "alice").await;
    store.fail_at_stage(stage, LedgerStoreError::query("injected"));

    let err = PurchaseEngine::new(Arc::clone(&store))
        .purchase(&alice, &kind("cup"))
        .await
        .expect_err("fault surfaces");

    assert!(matches!(err, PurchaseError::Storage(_)));
    let snapshot = AccountFacade::new(Arc::clone(&store))
        .snapshot(&alice)
        .await
        .expect("snapshot");
    assert_eq!(snapshot.balance, 1000);
    assert!(snapshot.inventory.is_empty());
}

#[rstest]
#[case(TransactionStage::AfterBalanceCheck)]
#[case(TransactionStage::AfterDebit)]
#[case(TransactionStage::AfterCredit)]
#[tokio::test]
async fn failed_transfer_leaves_no_trace(#[case] stage: TransactionStage) {
    let store = store();
    let alice = sign_in(&store, "alice").await;
    let bob = sign_in(&store, "bob").await;
    store.fail_at_stage(stage, LedgerStoreError::connection("injected"));

    let err = TransferEngine::new(Arc::clone(&store))
        .transfer(&alice, &Username::new("bob").expect("username"), 250)
        .await
        .expect_err("fault surfaces");

    assert!(matches!(err, TransferError::Storage(_)));
    assert_eq!(balance(&store, &alice).await, 1000);
    assert_eq!(balance(&store, &bob).await, 1000);
    assert_eq!(store.transfer_count(), Ok(0));
}
