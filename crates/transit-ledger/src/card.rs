//! # Card Service
//!
//! Card lifecycle and balance operations.
//!
//! ## Balance Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      credit / debit / adjust                            │
//! │                                                                         │
//! │  validate input                                                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  with_busy_retry ─────────────────────────────────────────────┐        │
//! │  │  unit = begin                                              │        │
//! │  │  guarded UPDATE ... RETURNING      (first statement)       │        │
//! │  │     ├── Applied  → record transaction → commit             │        │
//! │  │     └── Rejected → classify, drop unit (rollback)          │        │
//! │  └────────────────────────────────────────────────────────────┘        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  audit (best effort, after commit)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rejection Classification
//! | card read in unit | meaning             |
//! |-------------------|---------------------|
//! | none              | CardNotFound        |
//! | inactive          | CardInactive        |
//! | active            | InsufficientBalance (debit) / overflow (credit) |

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use transit_core::validation::{
    validate_adjustment, validate_card_number, validate_description, validate_document,
    validate_identifier, validate_positive_amount, validate_seed_balance,
};
use transit_core::{
    AuditAction, Card, CardClass, CardStats, CardStatus, CardUpdate, CoreError, Money, Page,
    Reconciliation, Transaction, TransactionKind,
};
use transit_db::{BalanceUpdate, Database, DbError, LedgerUnit};

use crate::audit::AuditRecorder;
use crate::collaborators::AccountDirectory;
use crate::error::{LedgerError, LedgerResult};
use crate::recorder::TransactionRecorder;
use crate::retry::{with_busy_retry, RetryPolicy};
use crate::selector::Selector;

const RESOURCE: &str = "cards";

/// Card lifecycle and balance operations.
#[derive(Clone)]
pub struct CardService {
    db: Database,
    accounts: Arc<dyn AccountDirectory>,
    recorder: TransactionRecorder,
    audit: Arc<AuditRecorder>,
    selector: Arc<Selector>,
    retry: RetryPolicy,
    number_attempts: u32,
}

impl CardService {
    pub fn new(
        db: Database,
        accounts: Arc<dyn AccountDirectory>,
        recorder: TransactionRecorder,
        audit: Arc<AuditRecorder>,
        selector: Arc<Selector>,
        retry: RetryPolicy,
        number_attempts: u32,
    ) -> Self {
        CardService {
            db,
            accounts,
            recorder,
            audit,
            selector,
            retry,
            number_attempts: number_attempts.max(1),
        }
    }

    // =========================================================================
    // Issuance
    // =========================================================================

    /// Issues the account's single card with an opening balance.
    ///
    /// A non-zero opening balance is recorded as a recharge so the card's
    /// ledger sums to its balance from the start.
    pub async fn issue(
        &self,
        actor_id: &str,
        account_id: &str,
        card_class: CardClass,
        seed_balance: Money,
    ) -> LedgerResult<Card> {
        validate_identifier("account_id", account_id)?;
        validate_seed_balance(seed_balance)?;

        if !self.accounts.account_exists(account_id).await? {
            return Err(CoreError::AccountNotFound {
                account_id: account_id.to_string(),
            }
            .into());
        }
        if self.db.cards().get_by_account(account_id).await?.is_some() {
            return Err(CoreError::DuplicateCard {
                account_id: account_id.to_string(),
            }
            .into());
        }

        let mut issued = None;
        for attempt in 1..=self.number_attempts {
            let number = self.selector.card_number();
            if self.db.cards().number_exists(&number).await? {
                debug!(attempt, "Card number taken, drawing again");
                continue;
            }

            let card = new_card(number, account_id, card_class, seed_balance);
            if let Some(card) =
                with_busy_retry(self.retry, "issue", || self.try_issue(&card)).await?
            {
                issued = Some(card);
                break;
            }
            debug!(attempt, "Card number collided on insert, drawing again");
        }

        let card = issued.ok_or(CoreError::NumberSpaceExhausted {
            attempts: self.number_attempts,
        })?;

        info!(card_number = %card.card_number, account_id = %account_id, balance = %card.balance(), "Card issued");
        self.audit
            .log(
                actor_id,
                RESOURCE,
                AuditAction::Create,
                format!(
                    "Issued {} card {} to account {} with balance {}",
                    card.card_class.as_str(),
                    card.card_number,
                    account_id,
                    card.balance()
                ),
            )
            .await;
        Ok(card)
    }

    /// One insert attempt. `Ok(None)` when the card number collided.
    async fn try_issue(&self, card: &Card) -> LedgerResult<Option<Card>> {
        let mut unit = self.db.begin_unit().await?;

        match unit.insert_card(card).await {
            Ok(()) => {}
            Err(e) if e.is_unique_on("cards.account_id") => {
                return Err(CoreError::DuplicateCard {
                    account_id: card.account_id.clone(),
                }
                .into());
            }
            Err(e) if e.is_unique_on("cards.card_number") => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        if card.balance().is_positive() {
            self.recorder
                .record(&mut unit, &card.card_number, TransactionKind::Recharge, card.balance())
                .await?;
        }
        unit.commit().await?;
        Ok(Some(card.clone()))
    }

    // =========================================================================
    // Balance Mutations
    // =========================================================================

    /// Adds `amount` to an active card and records a recharge.
    pub async fn credit(&self, actor_id: &str, card_number: &str, amount: Money) -> LedgerResult<Card> {
        validate_card_number(card_number)?;
        validate_positive_amount(amount)?;

        let card = with_busy_retry(self.retry, "credit", || self.try_credit(card_number, amount)).await?;

        info!(card_number = %card_number, amount = %amount, balance = %card.balance(), "Card recharged");
        self.audit
            .log(
                actor_id,
                RESOURCE,
                AuditAction::Update,
                format!("Recharged {} on card {}; balance {}", amount, card_number, card.balance()),
            )
            .await;
        Ok(card)
    }

    async fn try_credit(&self, card_number: &str, amount: Money) -> LedgerResult<Card> {
        let mut unit = self.db.begin_unit().await?;
        match unit.credit(card_number, amount).await? {
            BalanceUpdate::Applied(card) => {
                self.recorder
                    .record(&mut unit, card_number, TransactionKind::Recharge, amount)
                    .await?;
                unit.commit().await?;
                Ok(card)
            }
            BalanceUpdate::Rejected(current) => Err(classify_credit(card_number, current)),
        }
    }

    /// Subtracts `amount` from an active card and records a purchase.
    ///
    /// The balance never goes negative: of two concurrent debits that each
    /// need the whole balance, exactly one succeeds.
    pub async fn debit(&self, actor_id: &str, card_number: &str, amount: Money) -> LedgerResult<Card> {
        validate_card_number(card_number)?;
        validate_positive_amount(amount)?;

        let (card, _) = with_busy_retry(self.retry, "debit", || async {
            let mut unit = self.db.begin_unit().await?;
            let applied = debit_within(&mut unit, &self.recorder, card_number, amount).await?;
            unit.commit().await?;
            Ok::<_, LedgerError>(applied)
        })
        .await?;

        info!(card_number = %card_number, amount = %amount, balance = %card.balance(), "Card debited");
        self.audit
            .log(
                actor_id,
                RESOURCE,
                AuditAction::Update,
                format!("Debited {} from card {}; balance {}", amount, card_number, card.balance()),
            )
            .await;
        Ok(card)
    }

    /// Applies a signed correction with a reason. Allowed on inactive cards;
    /// never takes the balance below zero.
    pub async fn adjust(
        &self,
        actor_id: &str,
        card_number: &str,
        delta: Money,
        reason: &str,
    ) -> LedgerResult<Card> {
        validate_card_number(card_number)?;
        validate_adjustment(delta)?;
        validate_description(reason)?;

        let card = with_busy_retry(self.retry, "adjust", || async {
            let mut unit = self.db.begin_unit().await?;
            match unit.adjust(card_number, delta).await? {
                BalanceUpdate::Applied(card) => {
                    self.recorder
                        .record(&mut unit, card_number, TransactionKind::Adjustment, delta)
                        .await?;
                    unit.commit().await?;
                    Ok(card)
                }
                BalanceUpdate::Rejected(None) => Err(card_not_found(card_number)),
                BalanceUpdate::Rejected(Some(current)) if delta.is_negative() => {
                    Err(CoreError::InsufficientBalance {
                        card_number: card_number.to_string(),
                        required: delta.abs(),
                        available: current.balance(),
                    }
                    .into())
                }
                BalanceUpdate::Rejected(Some(_)) => Err(overflow()),
            }
        })
        .await?;

        info!(card_number = %card_number, delta = %delta, balance = %card.balance(), "Balance adjusted");
        self.audit
            .log(
                actor_id,
                RESOURCE,
                AuditAction::Update,
                format!("Adjusted card {} by {}: {}", card_number, delta, reason),
            )
            .await;
        Ok(card)
    }

    // =========================================================================
    // Balance Reads
    // =========================================================================

    /// Current balance. Read-only: writes no ledger row and no audit entry.
    pub async fn balance(&self, card_number: &str) -> LedgerResult<Money> {
        Ok(self.get_card(card_number).await?.balance())
    }

    /// Customer-facing balance check. Records a zero-amount
    /// `balance_inquiry` row and a CONSULT audit entry.
    pub async fn inquire_balance(&self, actor_id: &str, card_number: &str) -> LedgerResult<Money> {
        validate_card_number(card_number)?;
        self.get_card(card_number).await?;

        let balance = with_busy_retry(self.retry, "inquire_balance", || async {
            let mut unit = self.db.begin_unit().await?;
            self.recorder
                .record(&mut unit, card_number, TransactionKind::BalanceInquiry, Money::zero())
                .await?;
            let card = unit
                .current_card(card_number)
                .await?
                .ok_or_else(|| card_not_found(card_number))?;
            unit.commit().await?;
            Ok::<_, LedgerError>(card.balance())
        })
        .await?;

        self.audit
            .log(
                actor_id,
                RESOURCE,
                AuditAction::Consult,
                format!("Balance inquiry on card {}: {}", card_number, balance),
            )
            .await;
        Ok(balance)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Marks a card inactive. Idempotent.
    pub async fn deactivate(&self, actor_id: &str, card_number: &str) -> LedgerResult<Card> {
        self.set_status(actor_id, card_number, CardStatus::Inactive).await
    }

    /// Marks a card active again. Idempotent.
    pub async fn reactivate(&self, actor_id: &str, card_number: &str) -> LedgerResult<Card> {
        self.set_status(actor_id, card_number, CardStatus::Active).await
    }

    async fn set_status(&self, actor_id: &str, card_number: &str, status: CardStatus) -> LedgerResult<Card> {
        let update = CardUpdate {
            status: Some(status),
            ..Default::default()
        };
        let card = self.apply_update(card_number, &update).await?;

        info!(card_number = %card_number, status = status.as_str(), "Card status changed");
        self.audit
            .log(
                actor_id,
                RESOURCE,
                AuditAction::Update,
                format!("Set card {} {}", card_number, status.as_str()),
            )
            .await;
        Ok(card)
    }

    /// Changes class and/or status. An empty update returns the card as is.
    pub async fn update_card(&self, actor_id: &str, card_number: &str, update: &CardUpdate) -> LedgerResult<Card> {
        if update.is_empty() {
            return self.get_card(card_number).await;
        }
        let card = self.apply_update(card_number, update).await?;

        self.audit
            .log(
                actor_id,
                RESOURCE,
                AuditAction::Update,
                format!(
                    "Updated card {}: class {}, status {}",
                    card_number,
                    card.card_class.as_str(),
                    card.status.as_str()
                ),
            )
            .await;
        Ok(card)
    }

    async fn apply_update(&self, card_number: &str, update: &CardUpdate) -> LedgerResult<Card> {
        validate_card_number(card_number)?;
        with_busy_retry(self.retry, "update_card", || async {
            self.db
                .cards()
                .update(card_number, update)
                .await?
                .ok_or_else(|| card_not_found(card_number))
        })
        .await
    }

    /// Deletes a card that has never had a transaction.
    pub async fn delete_card(&self, actor_id: &str, card_number: &str) -> LedgerResult<()> {
        validate_card_number(card_number)?;
        self.get_card(card_number).await?;

        let history = self.db.transactions().count_for_card(card_number).await?;
        if history > 0 {
            return Err(CoreError::CardHasHistory {
                card_number: card_number.to_string(),
                transactions: history,
            }
            .into());
        }

        let deleted = match self.db.cards().delete(card_number).await {
            Ok(deleted) => deleted,
            Err(DbError::ForeignKeyViolation { .. }) => {
                // A transaction landed between the count and the delete.
                let transactions = self.db.transactions().count_for_card(card_number).await?;
                return Err(CoreError::CardHasHistory {
                    card_number: card_number.to_string(),
                    transactions: transactions.max(1),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };
        if !deleted {
            return Err(card_not_found(card_number));
        }

        warn!(card_number = %card_number, "Card deleted");
        self.audit
            .log(actor_id, RESOURCE, AuditAction::Delete, format!("Deleted card {}", card_number))
            .await;
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn get_card(&self, card_number: &str) -> LedgerResult<Card> {
        validate_card_number(card_number)?;
        self.db
            .cards()
            .get_by_number(card_number)
            .await?
            .ok_or_else(|| card_not_found(card_number))
    }

    /// The account's card, or `NoCardForAccount`.
    pub async fn card_for_account(&self, account_id: &str) -> LedgerResult<Card> {
        validate_identifier("account_id", account_id)?;
        self.db
            .cards()
            .get_by_account(account_id)
            .await?
            .ok_or_else(|| {
                CoreError::NoCardForAccount {
                    account_id: account_id.to_string(),
                }
                .into()
            })
    }

    /// Resolves an identity document to its account, then to the card.
    pub async fn card_for_document(&self, document: &str) -> LedgerResult<Card> {
        validate_document(document)?;
        let account_id = self
            .accounts
            .resolve_account_by_document(document)
            .await?
            .ok_or_else(|| CoreError::AccountNotFound {
                account_id: document.trim().to_string(),
            })?;
        self.card_for_account(&account_id).await
    }

    pub async fn list_cards(&self, status: Option<CardStatus>, page: Page) -> LedgerResult<Vec<Card>> {
        Ok(self.db.cards().list(status, page).await?)
    }

    pub async fn stats(&self) -> LedgerResult<CardStats> {
        Ok(self.db.cards().stats().await?)
    }

    /// Card history, recorded as a READ in the audit trail.
    pub async fn list_transactions(&self, actor_id: &str, card_number: &str) -> LedgerResult<Vec<Transaction>> {
        self.get_card(card_number).await?;
        let history = self.recorder.list_for_card(card_number).await?;

        self.audit
            .log(
                actor_id,
                "transactions",
                AuditAction::Read,
                format!("Listed {} transactions of card {}", history.len(), card_number),
            )
            .await;
        Ok(history)
    }

    /// Compares the stored balance with the ledger sum from one snapshot.
    pub async fn reconcile(&self, card_number: &str) -> LedgerResult<Reconciliation> {
        validate_card_number(card_number)?;

        let mut unit = self.db.begin_unit().await?;
        let card = unit
            .current_card(card_number)
            .await?
            .ok_or_else(|| card_not_found(card_number))?;
        let ledger_sum = unit.ledger_sum(card_number).await?;
        unit.rollback().await?;

        let report = Reconciliation {
            card_number: card_number.to_string(),
            balance: card.balance(),
            ledger_sum,
        };
        if !report.is_balanced() {
            warn!(
                card_number = %card_number,
                balance = %report.balance,
                ledger_sum = %report.ledger_sum,
                "Balance does not match ledger"
            );
        }
        Ok(report)
    }
}

// =============================================================================
// Shared Debit
// =============================================================================

/// Guarded debit plus its purchase row, inside the caller's unit.
///
/// The caller commits; dropping the unit discards both.
pub(crate) async fn debit_within(
    unit: &mut LedgerUnit,
    recorder: &TransactionRecorder,
    card_number: &str,
    amount: Money,
) -> LedgerResult<(Card, Transaction)> {
    match unit.debit(card_number, amount).await? {
        BalanceUpdate::Applied(card) => {
            let tx = recorder
                .record(unit, card_number, TransactionKind::Purchase, amount)
                .await?;
            Ok((card, tx))
        }
        BalanceUpdate::Rejected(None) => Err(card_not_found(card_number)),
        BalanceUpdate::Rejected(Some(current)) if !current.is_active() => Err(card_inactive(card_number)),
        BalanceUpdate::Rejected(Some(current)) => Err(CoreError::InsufficientBalance {
            card_number: card_number.to_string(),
            required: amount,
            available: current.balance(),
        }
        .into()),
    }
}

fn classify_credit(card_number: &str, current: Option<Card>) -> LedgerError {
    match current {
        None => card_not_found(card_number),
        Some(card) if !card.is_active() => card_inactive(card_number),
        Some(_) => overflow(),
    }
}

fn new_card(card_number: String, account_id: &str, card_class: CardClass, balance: Money) -> Card {
    let now = Utc::now();
    Card {
        id: Uuid::new_v4().to_string(),
        card_number,
        account_id: account_id.to_string(),
        card_class,
        status: CardStatus::Active,
        balance_cents: balance.cents(),
        last_recharge_at: balance.is_positive().then_some(now),
        created_at: now,
        updated_at: now,
    }
}

fn card_not_found(card_number: &str) -> LedgerError {
    CoreError::CardNotFound {
        card_number: card_number.to_string(),
    }
    .into()
}

fn card_inactive(card_number: &str) -> LedgerError {
    CoreError::CardInactive {
        card_number: card_number.to_string(),
    }
    .into()
}

fn overflow() -> LedgerError {
    CoreError::InvalidAmount {
        reason: "balance would overflow".to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================
