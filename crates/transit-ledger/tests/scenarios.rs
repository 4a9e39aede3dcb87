//! End-to-end ledger scenarios on an in-memory store.

mod common;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use transit_core::{
    AssignmentFilter, AuditAction, AuditEntry, CardClass, CoreError, ErrorKind, Money, Page,
    TransactionKind,
};
use transit_ledger::{
    AuditSink, Ledger, LedgerConfig, LedgerError, LedgerResult, PurchaseRequest, Selector,
    SqliteDirectory,
};

fn trip(account: &str) -> PurchaseRequest {
    PurchaseRequest {
        account_id: account.into(),
        vehicle_id: "V1".into(),
        route_id: "R1".into(),
    }
}

async fn assert_reconciled(ledger: &Ledger, card_number: &str) {
    let report = ledger.cards().reconcile(card_number).await.unwrap();
    assert!(report.balance.cents() >= 0);
    assert!(
        report.is_balanced(),
        "balance {} != ledger {}",
        report.balance,
        report.ledger_sum
    );
}

#[tokio::test]
async fn issue_credit_purchase() {
    let ledger = common::memory_ledger(|_| {}).await;

    let card = ledger.issue_card("ADMIN", "A1", CardClass::Standard, Money::zero()).await.unwrap();
    let after = ledger.credit("A1", &card.card_number, Money::from_cents(5000)).await.unwrap();
    assert_eq!(after.balance_cents, 5000);

    let receipt = ledger.purchase("A1", &trip("A1")).await.unwrap();
    assert_eq!(receipt.card.balance_cents, 2500);
    assert_eq!(ledger.balance(&card.card_number).await.unwrap().cents(), 2500);

    let history = ledger.list_transactions("A1", &card.card_number).await.unwrap();
    let amounts: Vec<i64> = history.iter().map(|t| t.amount_cents).collect();
    assert_eq!(amounts, vec![5000, -2500]);
    assert_eq!(history[1].kind, TransactionKind::Purchase);

    let assignments = ledger
        .list_assignments(&AssignmentFilter::Account("A1".into()))
        .await
        .unwrap();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].transaction_id, Some(history[1].id));

    assert_reconciled(&ledger, &card.card_number).await;

    let trail = ledger.list_audit(None, Page::default()).await.unwrap();
    let actions: Vec<AuditAction> = trail.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![AuditAction::Read, AuditAction::Create, AuditAction::Update, AuditAction::Create]
    );
    assert_eq!(ledger.list_audit(Some("ADMIN"), Page::default()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn debit_over_balance_changes_nothing() {
    let ledger = common::memory_ledger(|_| {}).await;
    let card = ledger
        .issue_card("ADMIN", "A1", CardClass::Standard, Money::from_cents(50))
        .await
        .unwrap();

    let err = ledger.debit("A1", &card.card_number, Money::from_cents(100)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
    assert_eq!(
        err.to_string(),
        format!(
            "Insufficient balance on card {}: required $1.00, available $0.50",
            card.card_number
        )
    );

    // Retrying the same rejected debit never books anything either.
    for _ in 0..3 {
        let retry = ledger.debit("A1", &card.card_number, Money::from_cents(100)).await.unwrap_err();
        assert_eq!(retry.kind(), ErrorKind::InsufficientBalance);
    }

    assert_eq!(ledger.balance(&card.card_number).await.unwrap().cents(), 50);
    let history = ledger.recorder().list_for_card(&card.card_number).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history.iter().all(|t| t.kind != TransactionKind::Purchase));
    assert!(ledger
        .list_assignments(&AssignmentFilter::Account("A1".into()))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn second_issue_for_account_is_rejected() {
    let ledger = common::memory_ledger(|_| {}).await;
    ledger.issue_card("ADMIN", "A1", CardClass::Standard, Money::zero()).await.unwrap();

    let err = ledger
        .issue_card("ADMIN", "A1", CardClass::Student, Money::from_cents(10))
        .await
        .unwrap_err();
    assert!(matches!(err.rule(), Some(CoreError::DuplicateCard { .. })));

    let stats = ledger.cards().stats().await.unwrap();
    assert_eq!(stats.total, 1);
}

// =============================================================================
// Audit failure reporting
// =============================================================================

struct BrokenSink;

#[async_trait]
impl AuditSink for BrokenSink {
    async fn append(&self, _: &str, _: &str, _: AuditAction, _: &str) -> LedgerResult<AuditEntry> {
        Err(LedgerError::Internal("audit store offline".into()))
    }

    async fn list(&self, _: Page, _: Option<AuditAction>) -> LedgerResult<Vec<AuditEntry>> {
        Ok(Vec::new())
    }

    async fn list_for_actor(&self, _: &str, _: Page) -> LedgerResult<Vec<AuditEntry>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn audit_failure_does_not_fail_credit() {
    let config = LedgerConfig::in_memory();
    let db = transit_db::Database::new(config.db_config()).await.unwrap();
    common::seed_reference(&db).await;

    let directory = Arc::new(SqliteDirectory::new(db.reference()));
    let ledger = Ledger::assemble(db, &config.ledger, directory.clone(), directory, Arc::new(BrokenSink)).unwrap();
    let mut failures = ledger.take_audit_failures().unwrap();

    let card = ledger.issue_card("ADMIN", "A1", CardClass::Standard, Money::zero()).await.unwrap();
    let after = ledger.credit("A1", &card.card_number, Money::from_cents(700)).await.unwrap();
    assert_eq!(after.balance_cents, 700);

    let issue_failure = failures.recv().await.unwrap();
    assert_eq!(issue_failure.action, AuditAction::Create);
    let credit_failure = failures.recv().await.unwrap();
    assert_eq!(credit_failure.action, AuditAction::Update);
    assert_eq!(credit_failure.actor_id, "A1");
    assert!(credit_failure.error.contains("audit store offline"));
    assert_eq!(ledger.audit().failure_count(), 2);

    assert_reconciled(&ledger, &card.card_number).await;
}

// =============================================================================
// Card numbers
// =============================================================================

#[tokio::test]
async fn card_number_space_exhaustion() {
    let seed = 2024;
    let ledger = common::memory_ledger(|c| {
        c.ledger.rng_seed = Some(seed);
        c.ledger.card_number_attempts = 3;
    })
    .await;

    // A selector with the same seed predicts the ledger's next draws.
    let predictor = Selector::seeded(seed);
    let taken: Vec<String> = (0..3).map(|_| predictor.card_number()).collect();
    for (account, number) in ["A2", "A3", "A4"].iter().zip(&taken) {
        let now = chrono::Utc::now();
        let card = transit_core::Card {
            id: uuid::Uuid::new_v4().to_string(),
            card_number: number.clone(),
            account_id: (*account).into(),
            card_class: CardClass::Standard,
            status: transit_core::CardStatus::Active,
            balance_cents: 0,
            last_recharge_at: None,
            created_at: now,
            updated_at: now,
        };
        let mut unit = ledger.database().begin_unit().await.unwrap();
        unit.insert_card(&card).await.unwrap();
        unit.commit().await.unwrap();
    }

    let err = ledger.issue_card("ADMIN", "A1", CardClass::Standard, Money::zero()).await.unwrap_err();
    assert!(matches!(err.rule(), Some(CoreError::NumberSpaceExhausted { attempts: 3 })));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    // The next draw is fresh.
    let card = ledger.issue_card("ADMIN", "A1", CardClass::Standard, Money::zero()).await.unwrap();
    assert!(!taken.contains(&card.card_number));
}

// =============================================================================
// Invariant sweep
// =============================================================================

#[tokio::test]
async fn random_operations_keep_ledger_consistent() {
    let ledger = common::memory_ledger(|c| c.ledger.rng_seed = Some(9)).await;
    let mut rng = StdRng::seed_from_u64(9);

    let mut cards = Vec::new();
    for account in ["A1", "A2", "A3"] {
        let seed = rng.gen_range(0..10_000);
        let card = ledger
            .issue_card("ADMIN", account, CardClass::Standard, Money::from_cents(seed))
            .await
            .unwrap();
        cards.push((account, card.card_number));
    }

    for _ in 0..120 {
        let (account, number) = &cards[rng.gen_range(0..cards.len())];
        let before = ledger.balance(number).await.unwrap();

        let outcome = match rng.gen_range(0..6) {
            0 => ledger.credit(account, number, Money::from_cents(rng.gen_range(1..5000))).await.map(|_| ()),
            1 => ledger.debit(account, number, Money::from_cents(rng.gen_range(1..5000))).await.map(|_| ()),
            2 => ledger.purchase(account, &trip(account)).await.map(|_| ()),
            3 => ledger.cards().inquire_balance(account, number).await.map(|_| ()),
            4 => {
                let delta = match rng.gen_range(-3000..3000) {
                    0 => 1,
                    d => d,
                };
                ledger
                    .cards()
                    .adjust("ADMIN", number, Money::from_cents(delta), "correction")
                    .await
                    .map(|_| ())
            }
            _ => {
                if rng.gen_bool(0.5) {
                    ledger.deactivate_card("ADMIN", number).await.map(|_| ())
                } else {
                    ledger.cards().reactivate("ADMIN", number).await.map(|_| ())
                }
            }
        };

        if let Err(e) = outcome {
            assert!(
                matches!(e.kind(), ErrorKind::InsufficientBalance | ErrorKind::Conflict),
                "unexpected error {e}"
            );
            assert_eq!(ledger.balance(number).await.unwrap(), before);
        }
        assert_reconciled(&ledger, number).await;
    }
}
