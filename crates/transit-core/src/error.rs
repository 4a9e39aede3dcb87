//! # Error Types
//!
//! Domain-specific error types for transit-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  transit-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Coarse taxonomy shared by every layer          │
//! │                                                                         │
//! │  transit-db errors (separate crate)                                    │
//! │  └── DbError          - Storage failures (Busy, constraints, ...)      │
//! │                                                                         │
//! │  transit-ledger errors                                                 │
//! │  └── LedgerError      - What callers see                               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → LedgerError → Caller    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Messages name the entity and the rule (card number, required vs available)
//! 3. Errors are enum variants, never String
//! 4. Every variant maps to exactly one [`ErrorKind`]

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse error taxonomy.
///
/// A presentation layer maps these onto status codes; retry loops only look
/// at [`ErrorKind::Busy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Referenced card, account, route, vehicle or assignment is absent.
    NotFound,
    /// Uniqueness or state conflict (duplicate card, inactive card, ...).
    Conflict,
    /// Malformed or out-of-range input.
    InvalidInput,
    /// Debit would drive a balance below zero.
    InsufficientBalance,
    /// Transient lock contention; safe to retry.
    Busy,
    /// Storage or programming failure.
    Internal,
}

impl ErrorKind {
    /// Stable string code.
    pub const fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorKind::Busy => "BUSY",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// These are returned to the caller without retry. Storage problems never
/// appear here; they live in `DbError`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No card carries this number.
    #[error("Card not found: {card_number}")]
    CardNotFound { card_number: String },

    /// The account collaborator does not know this account id.
    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: String },

    /// The account exists but has never been issued a card.
    #[error("Account {account_id} has no card")]
    NoCardForAccount { account_id: String },

    /// The account already owns a card.
    ///
    /// ## When This Occurs
    /// - `issue` called twice for the same account
    /// - Two concurrent `issue` calls race; the loser hits the UNIQUE index
    #[error("Account {account_id} already owns a card")]
    DuplicateCard { account_id: String },

    /// Balance operations are refused on an inactive card.
    #[error("Card {card_number} is inactive")]
    CardInactive { card_number: String },

    /// A debit would drive the balance below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Purchase (fare: $25.00)
    ///      │
    ///      ▼
    /// Guarded UPDATE matches no row (balance $0.50)
    ///      │
    ///      ▼
    /// InsufficientBalance { card_number, required: $25.00, available: $0.50 }
    ///      │
    ///      ▼
    /// Unit rolled back: no transaction, no assignment
    /// ```
    #[error("Insufficient balance on card {card_number}: required {required}, available {available}")]
    InsufficientBalance {
        card_number: String,
        required: Money,
        available: Money,
    },

    /// A trip fare exceeds the rider's balance.
    ///
    /// Same failure as `InsufficientBalance`, keyed by the account the
    /// purchase named so the card number stays out of the message.
    #[error("Insufficient balance for account {account_id}: required {required}, available {available}")]
    InsufficientFare {
        account_id: String,
        required: Money,
        available: Money,
    },

    /// The amount breaks a sign or range rule.
    #[error("Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Card number generation kept colliding.
    #[error("Could not generate a free card number after {attempts} attempts")]
    NumberSpaceExhausted { attempts: u32 },

    /// The card has ledger history and cannot be removed.
    #[error("Card {card_number} has {transactions} transaction(s) and cannot be deleted")]
    CardHasHistory {
        card_number: String,
        transactions: i64,
    },

    /// The reference data has no eligible staff member to assign.
    #[error("No eligible staff available for assignment")]
    NoEligibleStaff,

    /// A specific staff member was named but is unknown or not eligible.
    #[error("Staff member {staff_id} is not eligible for assignment")]
    StaffNotEligible { staff_id: String },

    /// Unknown or ineligible vehicle.
    #[error("Vehicle not found: {vehicle_id}")]
    VehicleNotFound { vehicle_id: String },

    /// Unknown or ineligible route.
    #[error("Route not found: {route_id}")]
    RouteNotFound { route_id: String },

    /// No assignment carries this id.
    #[error("Assignment not found: {assignment_id}")]
    AssignmentNotFound { assignment_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Maps the violation onto the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::CardNotFound { .. }
            | CoreError::AccountNotFound { .. }
            | CoreError::NoCardForAccount { .. }
            | CoreError::VehicleNotFound { .. }
            | CoreError::RouteNotFound { .. }
            | CoreError::AssignmentNotFound { .. } => ErrorKind::NotFound,

            CoreError::DuplicateCard { .. }
            | CoreError::CardInactive { .. }
            | CoreError::CardHasHistory { .. }
            | CoreError::NoEligibleStaff
            | CoreError::StaffNotEligible { .. }
            | CoreError::NumberSpaceExhausted { .. } => ErrorKind::Conflict,

            CoreError::InsufficientBalance { .. } | CoreError::InsufficientFare { .. } => {
                ErrorKind::InsufficientBalance
            }

            CoreError::InvalidAmount { .. } | CoreError::Validation(_) => ErrorKind::InvalidInput,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., card number that is not 16 digits).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
