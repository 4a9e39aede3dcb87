//! # Transaction Recorder
//!
//! Appends ledger rows. The sign of a row is derived from its kind, never
//! taken from the caller:
//!
//! | kind            | caller passes | stored as |
//! |-----------------|---------------|-----------|
//! | recharge        | amount > 0    | +amount   |
//! | purchase        | amount > 0    | -amount   |
//! | balance_inquiry | 0             | 0         |
//! | adjustment      | delta != 0    | delta     |
//!
//! Writes go through the caller's [`LedgerUnit`] so the row commits or rolls
//! back with the balance change it records.

use tracing::debug;

use transit_core::{Money, Transaction, TransactionKind};
use transit_db::{Database, LedgerUnit};

use crate::error::LedgerResult;

/// Appends and reads ledger rows.
#[derive(Debug, Clone)]
pub struct TransactionRecorder {
    db: Database,
}

impl TransactionRecorder {
    pub fn new(db: Database) -> Self {
        TransactionRecorder { db }
    }

    /// Records `kind` for `amount` inside `unit`.
    pub async fn record(
        &self,
        unit: &mut LedgerUnit,
        card_number: &str,
        kind: TransactionKind,
        amount: Money,
    ) -> LedgerResult<Transaction> {
        let signed = kind.signed(amount)?;
        let tx = unit.insert_transaction(card_number, kind, signed).await?;
        debug!(id = tx.id, card_number = %card_number, kind = %kind, "Transaction recorded");
        Ok(tx)
    }

    /// A card's history in insertion order.
    pub async fn list_for_card(&self, card_number: &str) -> LedgerResult<Vec<Transaction>> {
        Ok(self.db.transactions().list_for_card(card_number).await?)
    }

    pub async fn ledger_sum(&self, card_number: &str) -> LedgerResult<Money> {
        Ok(self.db.transactions().ledger_sum(card_number).await?)
    }

    pub async fn get(&self, id: i64) -> LedgerResult<Option<Transaction>> {
        Ok(self.db.transactions().get_by_id(id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::testing::{issue, seeded_db};
    use transit_core::CoreError;

    #[tokio::test]
    async fn test_sign_derived_from_kind() {
        let db = seeded_db().await;
        issue(&db, "A1", "1000000000000001", 0).await;
        let recorder = TransactionRecorder::new(db.clone());

        let mut unit = db.begin_unit().await.unwrap();
        let purchase = recorder
            .record(&mut unit, "1000000000000001", TransactionKind::Purchase, Money::from_cents(2500))
            .await
            .unwrap();
        let inquiry = recorder
            .record(&mut unit, "1000000000000001", TransactionKind::BalanceInquiry, Money::zero())
            .await
            .unwrap();
        unit.commit().await.unwrap();

        assert_eq!(purchase.amount_cents, -2500);
        assert_eq!(inquiry.amount_cents, 0);
        assert!(inquiry.id > purchase.id);

        let history = recorder.list_for_card("1000000000000001").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(recorder.ledger_sum("1000000000000001").await.unwrap().cents(), -2500);
        assert_eq!(recorder.get(purchase.id).await.unwrap(), Some(purchase));
    }

    #[tokio::test]
    async fn test_rejects_bad_amounts() {
        let db = seeded_db().await;
        issue(&db, "A1", "1000000000000001", 0).await;
        let recorder = TransactionRecorder::new(db.clone());

        let mut unit = db.begin_unit().await.unwrap();
        let err = recorder
            .record(&mut unit, "1000000000000001", TransactionKind::Recharge, Money::from_cents(-5))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rule(CoreError::InvalidAmount { .. })));

        let err = recorder
            .record(&mut unit, "1000000000000001", TransactionKind::Adjustment, Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rule(CoreError::InvalidAmount { .. })));
    }
}
