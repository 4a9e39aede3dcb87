//! # Transaction Repository
//!
//! Read access to the append-only ledger. Rows are only ever written by
//! [`LedgerUnit::insert_transaction`](crate::unit::LedgerUnit::insert_transaction);
//! triggers in the schema reject UPDATE and DELETE.

use sqlx::SqlitePool;

use super::TRANSACTION_COLUMNS;
use crate::error::DbResult;
use transit_core::{Money, Transaction};

/// Repository for ledger history.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets one transaction by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
        let tx = sqlx::query_as::<_, Transaction>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tx)
    }

    /// All transactions of a card in creation order.
    pub async fn list_for_card(&self, card_number: &str) -> DbResult<Vec<Transaction>> {
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE card_number = ?1 ORDER BY id"
        );
        let txs = sqlx::query_as::<_, Transaction>(&sql)
            .bind(card_number)
            .fetch_all(&self.pool)
            .await?;
        Ok(txs)
    }

    /// Σ amount_cents for a card. Zero when the card has no history.
    pub async fn ledger_sum(&self, card_number: &str) -> DbResult<Money> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM transactions WHERE card_number = ?1",
        )
        .bind(card_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(sum))
    }

    /// Number of transactions recorded against a card.
    pub async fn count_for_card(&self, card_number: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE card_number = ?1")
                .bind(card_number)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
