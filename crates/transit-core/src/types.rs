//! # Domain Types
//!
//! Records persisted by the ledger store and the value objects passed
//! between services.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Card       │   │   Transaction   │   │   Assignment    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  card_number    │◄──│  transaction_id │       │
//! │  │  card_number    │   │  kind           │   │  account_id     │       │
//! │  │  account_id     │   │  amount_cents   │   │  staff/vehicle  │       │
//! │  │  balance_cents  │   │  (signed)       │   │  route          │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   CardStatus    │   │ TransactionKind │   │   AuditEntry    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Active         │   │  Recharge   (+) │   │  actor_id       │       │
//! │  │  Inactive       │   │  Purchase   (-) │   │  resource       │       │
//! │  └─────────────────┘   │  Inquiry    (0) │   │  action         │       │
//! │                        │  Adjustment (±) │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! A card has:
//! - `id`: UUID v4, internal
//! - `card_number`: 16 digits, printed on the card and referenced by transactions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

// =============================================================================
// Card
// =============================================================================

/// Rider classification. Stored for reporting; fares ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum CardClass {
    /// Frequent rider.
    #[default]
    Standard,
    /// Student.
    Student,
    /// Senior citizen.
    Senior,
}

impl CardClass {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CardClass::Standard => "standard",
            CardClass::Student => "student",
            CardClass::Senior => "senior",
        }
    }
}

/// Card lifecycle state.
///
/// ```text
/// Active ──deactivate──► Inactive ──reactivate──► Active
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    #[default]
    Active,
    Inactive,
}

impl CardStatus {
    /// Column value, matching the sqlx encoding.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Active => "active",
            CardStatus::Inactive => "inactive",
        }
    }
}

/// A stored-value transit card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Card {
    /// Internal identifier (UUID v4).
    pub id: String,

    /// 16-digit externally presented number.
    pub card_number: String,

    /// Owning account. One card per account.
    pub account_id: String,

    pub card_class: CardClass,

    pub status: CardStatus,

    /// Balance in minor units, never negative.
    pub balance_cents: i64,

    /// Set by every successful recharge.
    pub last_recharge_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Card {
    /// Returns the balance as Money.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == CardStatus::Active
    }
}

/// Explicit partial update for a card.
///
/// Only these fields are settable; the balance is moved exclusively through
/// credit, debit and adjust.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardUpdate {
    pub card_class: Option<CardClass>,
    pub status: Option<CardStatus>,
}

impl CardUpdate {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.card_class.is_none() && self.status.is_none()
    }
}

/// Card population counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CardStats {
    pub total: i64,
    pub active: i64,
    pub inactive: i64,
}

/// Result of comparing a card balance with its transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub card_number: String,
    pub balance: Money,
    pub ledger_sum: Money,
}

impl Reconciliation {
    /// The ledger invariant: Σ amounts == balance.
    pub fn is_balanced(&self) -> bool {
        self.balance == self.ledger_sum
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// What kind of event a transaction records.
///
/// The kind determines the sign of the stored amount:
///
/// | Kind           | Stored amount |
/// |----------------|---------------|
/// | Recharge       | `+amount`     |
/// | Purchase       | `-amount`     |
/// | BalanceInquiry | `0`           |
/// | Adjustment     | as given      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Recharge,
    Purchase,
    BalanceInquiry,
    Adjustment,
}

impl TransactionKind {
    /// Derives the signed stored amount from a caller amount.
    ///
    /// Recharge and Purchase take a positive magnitude, BalanceInquiry takes
    /// zero, Adjustment takes any non-zero signed value.
    ///
    /// ## Example
    /// ```rust
    /// use transit_core::{Money, TransactionKind};
    ///
    /// let fare = Money::from_cents(2500);
    /// assert_eq!(TransactionKind::Recharge.signed(fare).unwrap().cents(), 2500);
    /// assert_eq!(TransactionKind::Purchase.signed(fare).unwrap().cents(), -2500);
    /// assert!(TransactionKind::BalanceInquiry.signed(fare).is_err());
    /// ```
    pub fn signed(&self, amount: Money) -> CoreResult<Money> {
        match self {
            TransactionKind::Recharge | TransactionKind::Purchase if !amount.is_positive() => {
                Err(CoreError::InvalidAmount {
                    reason: format!("{} amount must be positive, got {}", self, amount),
                })
            }
            TransactionKind::Recharge => Ok(amount),
            TransactionKind::Purchase => Ok(-amount),
            TransactionKind::BalanceInquiry if !amount.is_zero() => Err(CoreError::InvalidAmount {
                reason: format!("balance inquiry carries no amount, got {}", amount),
            }),
            TransactionKind::BalanceInquiry => Ok(Money::zero()),
            TransactionKind::Adjustment if amount.is_zero() => Err(CoreError::InvalidAmount {
                reason: "adjustment amount must be non-zero".to_string(),
            }),
            TransactionKind::Adjustment => Ok(amount),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionKind::Recharge => "recharge",
            TransactionKind::Purchase => "purchase",
            TransactionKind::BalanceInquiry => "balance_inquiry",
            TransactionKind::Adjustment => "adjustment",
        };
        f.write_str(s)
    }
}

/// An immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    /// Monotonic by creation order.
    pub id: i64,
    pub card_number: String,
    pub kind: TransactionKind,
    /// Signed: positive credit, negative debit, zero inquiry.
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Assignment
// =============================================================================

/// A trip grant linking a rider to a staff member, vehicle and route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Assignment {
    /// UUID v4.
    pub id: String,
    pub account_id: String,
    pub staff_id: String,
    pub vehicle_id: String,
    pub route_id: String,
    /// Purchase transaction that paid for this trip. `None` for admin grants.
    pub transaction_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for an administrative assignment (no debit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub account_id: String,
    pub staff_id: String,
    pub vehicle_id: String,
    pub route_id: String,
}

/// Explicit partial update for an assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentUpdate {
    pub staff_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub route_id: Option<String>,
}

impl AssignmentUpdate {
    pub fn is_empty(&self) -> bool {
        self.staff_id.is_none() && self.vehicle_id.is_none() && self.route_id.is_none()
    }
}

/// Which assignments to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentFilter {
    Account(String),
    Staff(String),
    Vehicle(String),
    All(Page),
}

// =============================================================================
// Audit
// =============================================================================

/// What an actor did to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Read,
    Update,
    Delete,
    Consult,
}

impl AuditAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Read => "READ",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Consult => "CONSULT",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only record of who did what to which resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditEntry {
    pub id: i64,
    pub actor_id: String,
    pub resource: String,
    pub action: AuditAction,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Paging
// =============================================================================

/// Offset/limit window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Page {
    /// Builds a page, clamping the limit to `1..=MAX_PAGE_SIZE`.
    pub fn new(offset: u32, limit: u32) -> Self {
        Page {
            offset,
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_amounts() {
        let amount = Money::from_cents(5000);
        assert_eq!(TransactionKind::Recharge.signed(amount).unwrap().cents(), 5000);
        assert_eq!(TransactionKind::Purchase.signed(amount).unwrap().cents(), -5000);
        assert_eq!(
            TransactionKind::Adjustment.signed(-amount).unwrap().cents(),
            -5000
        );
        assert!(TransactionKind::BalanceInquiry
            .signed(Money::zero())
            .unwrap()
            .is_zero());
    }

    #[test]
    fn test_signed_rejects_bad_combinations() {
        let neg = Money::from_cents(-1);
        assert!(matches!(
            TransactionKind::Recharge.signed(neg),
            Err(CoreError::InvalidAmount { .. })
        ));
        assert!(TransactionKind::Purchase.signed(Money::zero()).is_err());
        assert!(TransactionKind::BalanceInquiry.signed(Money::from_cents(1)).is_err());
        assert!(TransactionKind::Adjustment.signed(Money::zero()).is_err());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::BalanceInquiry).unwrap(),
            "\"balance_inquiry\""
        );
        assert_eq!(serde_json::to_string(&AuditAction::Consult).unwrap(), "\"CONSULT\"");
        assert_eq!(serde_json::to_string(&CardStatus::Inactive).unwrap(), "\"inactive\"");
        assert_eq!(CardStatus::Inactive.as_str(), "inactive");
    }

    #[test]
    fn test_page_clamps_limit() {
        assert_eq!(Page::new(0, 0).limit, 1);
        assert_eq!(Page::new(10, 5000).limit, MAX_PAGE_SIZE);
        assert_eq!(Page::default().limit, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_reconciliation_balanced() {
        let rec = Reconciliation {
            card_number: "1234567890123456".into(),
            balance: Money::from_cents(2500),
            ledger_sum: Money::from_cents(2500),
        };
        assert!(rec.is_balanced());
    }

    #[test]
    fn test_update_is_empty() {
        assert!(CardUpdate::default().is_empty());
        assert!(!AssignmentUpdate {
            route_id: Some("R1".into()),
            ..Default::default()
        }
        .is_empty());
    }
}
