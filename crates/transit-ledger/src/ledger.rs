//! # Ledger
//!
//! Wires the store, the collaborators and the services together.
//!
//! ```text
//! LedgerConfig ──► Database ──┬──► TransactionRecorder ─┐
//!                             ├──► SqliteDirectory ─────┼──► CardService
//!                             ├──► SqliteAuditSink ─────┤
//!                             │        AuditRecorder ───┼──► TripWorkflow
//!                             └──► Selector (seeded) ───┘
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use transit_core::{
    Assignment, AssignmentFilter, AuditEntry, Card, CardClass, Money, NewAssignment, Page,
    Transaction,
};
use transit_db::Database;

use crate::audit::{AuditFailure, AuditRecorder, AuditSink, SqliteAuditSink};
use crate::card::CardService;
use crate::collaborators::{AccountDirectory, ReferenceData, SqliteDirectory};
use crate::config::{LedgerConfig, LedgerSettings};
use crate::error::LedgerResult;
use crate::recorder::TransactionRecorder;
use crate::selector::Selector;
use crate::trip::{PurchaseRequest, TripReceipt, TripWorkflow};

/// The assembled ledger.
pub struct Ledger {
    db: Database,
    cards: CardService,
    trips: TripWorkflow,
    recorder: TransactionRecorder,
    audit: Arc<AuditRecorder>,
    audit_failures: Mutex<Option<mpsc::Receiver<AuditFailure>>>,
}

impl Ledger {
    /// Opens the store described by `config` and builds the services on it.
    pub async fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()).await?;
        Self::with_database(db, &config.ledger)
    }

    /// Services over an existing store, using its reference tables and
    /// audit log.
    pub fn with_database(db: Database, settings: &LedgerSettings) -> LedgerResult<Self> {
        let directory = Arc::new(SqliteDirectory::new(db.reference()));
        let sink = Arc::new(SqliteAuditSink::new(db.audit()));
        Self::assemble(db, settings, directory.clone(), directory, sink)
    }

    /// Services with caller-supplied collaborators and audit sink.
    pub fn assemble(
        db: Database,
        settings: &LedgerSettings,
        accounts: Arc<dyn AccountDirectory>,
        reference: Arc<dyn ReferenceData>,
        sink: Arc<dyn AuditSink>,
    ) -> LedgerResult<Self> {
        let fare = settings.fare_policy()?;
        let retry = settings.retry_policy();
        let selector = Arc::new(Selector::from_seed(settings.rng_seed));
        let recorder = TransactionRecorder::new(db.clone());

        let (audit, receiver) = if settings.audit_channel_capacity > 0 {
            let (recorder, rx) = AuditRecorder::with_failure_channel(sink, settings.audit_channel_capacity);
            (recorder, Some(rx))
        } else {
            (AuditRecorder::new(sink), None)
        };
        let audit = Arc::new(audit);

        let cards = CardService::new(
            db.clone(),
            accounts.clone(),
            recorder.clone(),
            audit.clone(),
            selector.clone(),
            retry,
            settings.card_number_attempts,
        );
        let trips = TripWorkflow::new(
            db.clone(),
            accounts,
            reference,
            recorder.clone(),
            audit.clone(),
            selector,
            fare,
            retry,
        );

        info!(
            fare = %fare.base_fare(),
            busy_retries = retry.max_retries,
            seeded = settings.rng_seed.is_some(),
            "Ledger ready"
        );

        Ok(Ledger {
            db,
            cards,
            trips,
            recorder,
            audit,
            audit_failures: Mutex::new(receiver),
        })
    }

    pub fn cards(&self) -> &CardService {
        &self.cards
    }

    pub fn trips(&self) -> &TripWorkflow {
        &self.trips
    }

    pub fn recorder(&self) -> &TransactionRecorder {
        &self.recorder
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Operations
    // =========================================================================

    pub async fn issue_card(
        &self,
        actor_id: &str,
        account_id: &str,
        card_class: CardClass,
        seed_balance: Money,
    ) -> LedgerResult<Card> {
        self.cards.issue(actor_id, account_id, card_class, seed_balance).await
    }

    pub async fn credit(&self, actor_id: &str, card_number: &str, amount: Money) -> LedgerResult<Card> {
        self.cards.credit(actor_id, card_number, amount).await
    }

    pub async fn debit(&self, actor_id: &str, card_number: &str, amount: Money) -> LedgerResult<Card> {
        self.cards.debit(actor_id, card_number, amount).await
    }

    pub async fn purchase(&self, actor_id: &str, request: &PurchaseRequest) -> LedgerResult<TripReceipt> {
        self.trips.purchase(actor_id, request).await
    }

    pub async fn balance(&self, card_number: &str) -> LedgerResult<Money> {
        self.cards.balance(card_number).await
    }

    pub async fn list_transactions(&self, actor_id: &str, card_number: &str) -> LedgerResult<Vec<Transaction>> {
        self.cards.list_transactions(actor_id, card_number).await
    }

    pub async fn list_assignments(&self, filter: &AssignmentFilter) -> LedgerResult<Vec<Assignment>> {
        self.trips.list_assignments(filter).await
    }

    pub async fn deactivate_card(&self, actor_id: &str, card_number: &str) -> LedgerResult<Card> {
        self.cards.deactivate(actor_id, card_number).await
    }

    pub async fn create_assignment(&self, actor_id: &str, new: &NewAssignment) -> LedgerResult<Assignment> {
        self.trips.create_assignment(actor_id, new).await
    }

    /// Audit entries newest first, for one actor or for everyone.
    pub async fn list_audit(&self, actor_id: Option<&str>, page: Page) -> LedgerResult<Vec<AuditEntry>> {
        match actor_id {
            Some(actor) => self.audit.list_for_actor(actor, page).await,
            None => self.audit.list(page, None).await,
        }
    }

    /// Hands out the audit failure receiver. `None` after the first call or
    /// when the channel is disabled.
    pub fn take_audit_failures(&self) -> Option<mpsc::Receiver<AuditFailure>> {
        self.audit_failures.lock().take()
    }

    /// Closes the store's connection pool.
    pub async fn close(&self) {
        self.db.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use transit_core::{AuditAction, CardClass, Money};
    use transit_db::AccountRecord;

    #[tokio::test]
    async fn test_open_in_memory() {
        let mut config = LedgerConfig::in_memory();
        config.ledger.rng_seed = Some(11);
        let ledger = Ledger::open(&config).await.unwrap();

        ledger
            .database()
            .reference()
            .insert_account(&AccountRecord {
                id: "A1".into(),
                document: "123456".into(),
                full_name: "Rider".into(),
            })
            .await
            .unwrap();

        let card = ledger
            .cards()
            .issue("A1", "A1", CardClass::Standard, Money::from_cents(100))
            .await
            .unwrap();
        assert_eq!(ledger.recorder().ledger_sum(&card.card_number).await.unwrap().cents(), 100);

        let created = ledger
            .audit()
            .list(Default::default(), Some(AuditAction::Create))
            .await
            .unwrap();
        assert_eq!(created.len(), 1);

        assert!(ledger.take_audit_failures().is_some());
        assert!(ledger.take_audit_failures().is_none());
    }

    #[tokio::test]
    async fn test_channel_disabled() {
        let mut config = LedgerConfig::in_memory();
        config.ledger.audit_channel_capacity = 0;
        let ledger = Ledger::open(&config).await.unwrap();
        assert!(ledger.take_audit_failures().is_none());
    }
}
