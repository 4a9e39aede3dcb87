//! # Ledger Unit
//!
//! The atomic read-modify-write primitive. Every balance mutation and the
//! transaction row that records it are written through one `LedgerUnit`,
//! which wraps a single sqlx transaction.
//!
//! ## Locking on SQLite
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SQLite has no row locks. The first write in a transaction takes the   │
//! │  database write lock, so the guarded UPDATE is ALWAYS the first        │
//! │  statement of a unit:                                                  │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    UPDATE cards SET balance_cents = balance_cents - :fare              │
//! │     WHERE card_number = :n AND status = 'active'                       │
//! │       AND balance_cents >= :fare            ← evaluated under the lock │
//! │    RETURNING ...                                                       │
//! │        │                                                                │
//! │        ├── row      → Applied(card)   → insert transaction, commit     │
//! │        └── no row   → Rejected(card?) → caller classifies, drops unit  │
//! │                                                                         │
//! │  Two debits of X on a balance of X: the second UPDATE waits for the    │
//! │  first commit (busy_timeout), then matches no row.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cancellation
//! Dropping a `LedgerUnit` without [`LedgerUnit::commit`] rolls back every
//! statement issued through it.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction as SqlxTransaction};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{CARD_COLUMNS, TRANSACTION_COLUMNS};
use transit_core::{Assignment, Card, Money, Transaction, TransactionKind};

// =============================================================================
// Balance Update Outcome
// =============================================================================

/// Result of a guarded balance update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceUpdate {
    /// The guard held; the card as it stands after the update.
    Applied(Card),
    /// The guard failed. Carries the card as read inside the unit, or `None`
    /// when no card has that number.
    Rejected(Option<Card>),
}

// =============================================================================
// Ledger Unit
// =============================================================================

/// One atomic unit of ledger work.
#[derive(Debug)]
pub struct LedgerUnit {
    tx: SqlxTransaction<'static, Sqlite>,
}

impl LedgerUnit {
    /// Opens a unit on the pool.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let tx = pool.begin().await?;
        Ok(LedgerUnit { tx })
    }

    /// Decreases the balance if the card is active and holds at least `amount`.
    pub async fn debit(&mut self, card_number: &str, amount: Money) -> DbResult<BalanceUpdate> {
        debug!(card_number = %card_number, amount = %amount, "Guarded debit");

        let sql = format!(
            "UPDATE cards SET \
                 balance_cents = balance_cents - ?1, \
                 updated_at = ?2 \
             WHERE card_number = ?3 AND status = 'active' AND balance_cents >= ?1 \
             RETURNING {CARD_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Card>(&sql)
            .bind(amount.cents())
            .bind(Utc::now())
            .bind(card_number)
            .fetch_optional(&mut *self.tx)
            .await?;

        self.outcome(card_number, updated).await
    }

    /// Increases the balance of an active card and stamps the recharge time.
    ///
    /// Rejected as well when the result would overflow i64.
    pub async fn credit(&mut self, card_number: &str, amount: Money) -> DbResult<BalanceUpdate> {
        debug!(card_number = %card_number, amount = %amount, "Guarded credit");

        let now = Utc::now();
        let sql = format!(
            "UPDATE cards SET \
                 balance_cents = balance_cents + ?1, \
                 last_recharge_at = ?2, \
                 updated_at = ?2 \
             WHERE card_number = ?3 AND status = 'active' AND balance_cents <= ?4 \
             RETURNING {CARD_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Card>(&sql)
            .bind(amount.cents())
            .bind(now)
            .bind(card_number)
            .bind(i64::MAX - amount.cents())
            .fetch_optional(&mut *self.tx)
            .await?;

        self.outcome(card_number, updated).await
    }

    /// Applies a signed correction regardless of status, never below zero.
    pub async fn adjust(&mut self, card_number: &str, delta: Money) -> DbResult<BalanceUpdate> {
        debug!(card_number = %card_number, delta = %delta, "Guarded adjustment");

        let ceiling = i64::MAX - delta.cents().max(0);
        let sql = format!(
            "UPDATE cards SET \
                 balance_cents = balance_cents + ?1, \
                 updated_at = ?2 \
             WHERE card_number = ?3 AND balance_cents + ?1 >= 0 AND balance_cents <= ?4 \
             RETURNING {CARD_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Card>(&sql)
            .bind(delta.cents())
            .bind(Utc::now())
            .bind(card_number)
            .bind(ceiling)
            .fetch_optional(&mut *self.tx)
            .await?;

        self.outcome(card_number, updated).await
    }

    async fn outcome(&mut self, card_number: &str, updated: Option<Card>) -> DbResult<BalanceUpdate> {
        match updated {
            Some(card) => Ok(BalanceUpdate::Applied(card)),
            None => Ok(BalanceUpdate::Rejected(self.current_card(card_number).await?)),
        }
    }

    /// Reads a card through this unit's connection.
    pub async fn current_card(&mut self, card_number: &str) -> DbResult<Option<Card>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE card_number = ?1");
        let card = sqlx::query_as::<_, Card>(&sql)
            .bind(card_number)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(card)
    }

    /// Sum of the card's signed ledger amounts, read through this unit.
    pub async fn ledger_sum(&mut self, card_number: &str) -> DbResult<Money> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM transactions WHERE card_number = ?1",
        )
        .bind(card_number)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(Money::from_cents(sum))
    }

    /// Inserts a new card row.
    pub async fn insert_card(&mut self, card: &Card) -> DbResult<()> {
        debug!(card_number = %card.card_number, account_id = %card.account_id, "Inserting card");

        sqlx::query(
            r#"
            INSERT INTO cards (
                id, card_number, account_id, card_class, status,
                balance_cents, last_recharge_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&card.id)
        .bind(&card.card_number)
        .bind(&card.account_id)
        .bind(card.card_class)
        .bind(card.status)
        .bind(card.balance_cents)
        .bind(card.last_recharge_at)
        .bind(card.created_at)
        .bind(card.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Appends a ledger row with an already signed amount.
    pub async fn insert_transaction(
        &mut self,
        card_number: &str,
        kind: TransactionKind,
        signed_amount: Money,
    ) -> DbResult<Transaction> {
        debug!(card_number = %card_number, kind = %kind, amount = %signed_amount, "Recording transaction");

        let sql = format!(
            "INSERT INTO transactions (card_number, kind, amount_cents, created_at) \
             VALUES (?1, ?2, ?3, ?4) \
             RETURNING {TRANSACTION_COLUMNS}"
        );
        let tx = sqlx::query_as::<_, Transaction>(&sql)
            .bind(card_number)
            .bind(kind)
            .bind(signed_amount.cents())
            .bind(Utc::now())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(tx)
    }

    /// Inserts an assignment inside the unit.
    pub async fn insert_assignment(&mut self, assignment: &Assignment) -> DbResult<()> {
        debug!(id = %assignment.id, transaction_id = ?assignment.transaction_id, "Inserting assignment");

        sqlx::query(
            r#"
            INSERT INTO assignments (
                id, account_id, staff_id, vehicle_id, route_id,
                transaction_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&assignment.id)
        .bind(&assignment.account_id)
        .bind(&assignment.staff_id)
        .bind(&assignment.vehicle_id)
        .bind(&assignment.route_id)
        .bind(assignment.transaction_id)
        .bind(assignment.created_at)
        .bind(assignment.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    /// Makes every statement of the unit durable.
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    /// Discards the unit explicitly. Dropping has the same effect.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
