//! Contention behavior on an on-disk store with a multi-connection pool.

mod common;

use std::sync::Arc;
use std::time::Duration;

use transit_core::{AssignmentFilter, CardClass, CoreError, ErrorKind, Money, Page, TransactionKind};
use transit_ledger::{LedgerError, PurchaseRequest};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_debits_of_whole_balance() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(common::file_ledger(dir.path(), |_| {}).await);
    let card = ledger
        .issue_card("ADMIN", "A1", CardClass::Standard, Money::from_cents(2500))
        .await
        .unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let ledger = ledger.clone();
            let number = card.card_number.clone();
            tokio::spawn(async move { ledger.debit("A1", &number, Money::from_cents(2500)).await })
        })
        .collect();

    let mut successes = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(card) => {
                assert_eq!(card.balance_cents, 0);
                successes += 1;
            }
            Err(e) if e.kind() == ErrorKind::InsufficientBalance => insufficient += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((successes, insufficient), (1, 1));

    assert_eq!(ledger.balance(&card.card_number).await.unwrap().cents(), 0);
    let history = ledger.recorder().list_for_card(&card.card_number).await.unwrap();
    assert_eq!(
        history.iter().filter(|t| t.kind == TransactionKind::Purchase).count(),
        1
    );
    assert!(ledger.cards().reconcile(&card.card_number).await.unwrap().is_balanced());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_never_overdraw() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Arc::new(common::file_ledger(dir.path(), |c| c.ledger.rng_seed = Some(5)).await);
    let card = ledger
        .issue_card("ADMIN", "A1", CardClass::Standard, Money::from_cents(4 * 2500))
        .await
        .unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .purchase(
                        "A1",
                        &PurchaseRequest {
                            account_id: "A1".into(),
                            vehicle_id: "V1".into(),
                            route_id: "R1".into(),
                        },
                    )
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => {
                assert!(receipt.card.balance_cents >= 0);
                successes += 1;
            }
            Err(LedgerError::Rule(CoreError::InsufficientFare { .. })) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(successes, 4);

    assert_eq!(ledger.balance(&card.card_number).await.unwrap().cents(), 0);
    assert_eq!(
        ledger
            .list_assignments(&AssignmentFilter::Account("A1".into()))
            .await
            .unwrap()
            .len(),
        4
    );
    assert!(ledger.cards().reconcile(&card.card_number).await.unwrap().is_balanced());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lock_held_past_timeout_is_busy() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = common::file_ledger(dir.path(), |c| {
        c.database.lock_timeout_ms = 100;
        c.ledger.busy_retries = 0;
    })
    .await;
    let card = ledger
        .issue_card("ADMIN", "A1", CardClass::Standard, Money::from_cents(1000))
        .await
        .unwrap();

    // Another writer holds the write lock.
    let mut holder = ledger.database().begin_unit().await.unwrap();
    holder.debit(&card.card_number, Money::from_cents(1)).await.unwrap();

    let err = ledger
        .credit("A1", &card.card_number, Money::from_cents(100))
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "expected busy, got {err}");
    assert_eq!(err.kind(), ErrorKind::Busy);

    holder.rollback().await.unwrap();
    assert_eq!(ledger.balance(&card.card_number).await.unwrap().cents(), 1000);

    // With the lock released the same call succeeds.
    let after = ledger.credit("A1", &card.card_number, Money::from_cents(100)).await.unwrap();
    assert_eq!(after.balance_cents, 1100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn busy_retry_outlasts_short_lock() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = common::file_ledger(dir.path(), |c| {
        c.database.lock_timeout_ms = 50;
        c.ledger.busy_retries = 10;
        c.ledger.retry_backoff_ms = 20;
    })
    .await;
    let card = ledger
        .issue_card("ADMIN", "A1", CardClass::Standard, Money::from_cents(1000))
        .await
        .unwrap();

    let mut holder = ledger.database().begin_unit().await.unwrap();
    holder.debit(&card.card_number, Money::from_cents(1)).await.unwrap();
    let release = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        holder.rollback().await.unwrap();
    });

    let after = ledger.debit("A1", &card.card_number, Money::from_cents(300)).await.unwrap();
    assert_eq!(after.balance_cents, 700);
    release.await.unwrap();
    assert!(ledger.cards().reconcile(&card.card_number).await.unwrap().is_balanced());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_debit_leaves_no_trace() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = common::file_ledger(dir.path(), |_| {}).await;
    let card = ledger
        .issue_card("ADMIN", "A1", CardClass::Standard, Money::from_cents(1000))
        .await
        .unwrap();

    let mut holder = ledger.database().begin_unit().await.unwrap();
    holder.debit(&card.card_number, Money::from_cents(1)).await.unwrap();

    // The debit is still waiting for the lock when the caller gives up.
    let attempt = tokio::time::timeout(
        Duration::from_millis(100),
        ledger.debit("A1", &card.card_number, Money::from_cents(500)),
    )
    .await;
    assert!(attempt.is_err());

    holder.rollback().await.unwrap();

    assert_eq!(ledger.balance(&card.card_number).await.unwrap().cents(), 1000);
    let history = ledger.recorder().list_for_card(&card.card_number).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(ledger.audit().list(Page::default(), None).await.unwrap().len() == 1);

    let after = ledger.debit("A1", &card.card_number, Money::from_cents(500)).await.unwrap();
    assert_eq!(after.balance_cents, 500);
    assert!(ledger.cards().reconcile(&card.card_number).await.unwrap().is_balanced());
}
