//! # Card Repository
//!
//! Lookups and non-monetary updates for cards.
//!
//! ## What Lives Here vs. LedgerUnit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CardRepository (pool)              LedgerUnit (sqlx transaction)      │
//! │  ───────────────────────            ──────────────────────────────     │
//! │  get_by_number / get_by_account     insert_card (+ seed recharge)      │
//! │  list / stats                       credit / debit / adjust            │
//! │  update (class, status)             insert_transaction                 │
//! │  delete (refused by FK if history)  insert_assignment                  │
//! │                                                                         │
//! │  balance_cents is never written from this file                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::CARD_COLUMNS;
use crate::error::DbResult;
use transit_core::{Card, CardStats, CardStatus, CardUpdate, Page};

/// Repository for card database operations.
#[derive(Debug, Clone)]
pub struct CardRepository {
    pool: SqlitePool,
}

impl CardRepository {
    /// Creates a new CardRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CardRepository { pool }
    }

    /// Gets a card by its 16-digit number.
    pub async fn get_by_number(&self, card_number: &str) -> DbResult<Option<Card>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE card_number = ?1");
        let card = sqlx::query_as::<_, Card>(&sql)
            .bind(card_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(card)
    }

    /// Gets the card owned by an account.
    pub async fn get_by_account(&self, account_id: &str) -> DbResult<Option<Card>> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE account_id = ?1");
        let card = sqlx::query_as::<_, Card>(&sql)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(card)
    }

    /// Checks whether a card number is already taken.
    pub async fn number_exists(&self, card_number: &str) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cards WHERE card_number = ?1)")
                .bind(card_number)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Lists cards, optionally filtered by status, oldest first.
    pub async fn list(&self, status: Option<CardStatus>, page: Page) -> DbResult<Vec<Card>> {
        debug!(?status, offset = page.offset, limit = page.limit, "Listing cards");

        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM cards \
             WHERE (?1 IS NULL OR status = ?1) \
             ORDER BY created_at, id \
             LIMIT ?2 OFFSET ?3"
        );
        let cards = sqlx::query_as::<_, Card>(&sql)
            .bind(status)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await?;
        Ok(cards)
    }

    /// Counts cards by status.
    pub async fn stats(&self) -> DbResult<CardStats> {
        let stats = sqlx::query_as::<_, CardStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(status = 'active'), 0) AS active,
                COALESCE(SUM(status = 'inactive'), 0) AS inactive
            FROM cards
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Applies a partial update to the settable columns.
    ///
    /// Only `card_class` and `status` can change. Returns `None` when no card
    /// carries this number.
    pub async fn update(&self, card_number: &str, update: &CardUpdate) -> DbResult<Option<Card>> {
        debug!(card_number = %card_number, ?update, "Updating card");

        let sql = format!(
            "UPDATE cards SET \
                 card_class = COALESCE(?1, card_class), \
                 status = COALESCE(?2, status), \
                 updated_at = ?3 \
             WHERE card_number = ?4 \
             RETURNING {CARD_COLUMNS}"
        );
        let card = sqlx::query_as::<_, Card>(&sql)
            .bind(update.card_class)
            .bind(update.status)
            .bind(Utc::now())
            .bind(card_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(card)
    }

    /// Deletes a card.
    ///
    /// A card with transactions is protected by `ON DELETE RESTRICT`; the
    /// attempt surfaces as `DbError::ForeignKeyViolation`.
    pub async fn delete(&self, card_number: &str) -> DbResult<bool> {
        debug!(card_number = %card_number, "Deleting card");

        let result = sqlx::query("DELETE FROM cards WHERE card_number = ?1")
            .bind(card_number)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
