//! # Ledger Error Types
//!
//! What callers of the services see.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Ledger Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Business rule  │  │   Contention    │  │     Storage             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Rule(CoreError)│  │  Busy           │  │  Conflict (constraint)  │ │
//! │  │  NOT retried    │  │  retried with   │  │  Internal               │ │
//! │  │                 │  │  linear backoff │  │  NOT retried            │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  Configuration  │  Config (bad TOML, invalid values)                │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use transit_core::{CoreError, ErrorKind, ValidationError};
use transit_db::DbError;

/// Result type alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger error type.
#[derive(Debug, Error)]
pub enum LedgerError {
    // =========================================================================
    // Business Rules
    // =========================================================================
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Rule(#[from] CoreError),

    // =========================================================================
    // Storage
    // =========================================================================
    /// Lock contention outlasted every retry.
    #[error("Store busy: {0}")]
    Busy(String),

    /// A constraint the services did not anticipate rejected a write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage or programming failure.
    #[error("Internal error: {0}")]
    Internal(String),

    // =========================================================================
    // Configuration
    // =========================================================================
    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LedgerError {
    /// Maps the error onto the shared taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Rule(e) => e.kind(),
            LedgerError::Busy(_) => ErrorKind::Busy,
            LedgerError::Conflict(_) => ErrorKind::Conflict,
            LedgerError::Internal(_) | LedgerError::Config(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if retrying the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Busy(_))
    }

    /// Returns the business rule violation, if this is one.
    pub fn rule(&self) -> Option<&CoreError> {
        match self {
            LedgerError::Rule(e) => Some(e),
            _ => None,
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Busy(msg) => LedgerError::Busy(msg),
            e @ (DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. }) => {
                LedgerError::Conflict(e.to_string())
            }
            other => LedgerError::Internal(other.to_string()),
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Rule(CoreError::Validation(err))
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use transit_core::Money;

    #[test]
    fn test_db_error_mapping() {
        let busy: LedgerError = DbError::Busy("database is locked".into()).into();
        assert!(busy.is_retryable());
        assert_eq!(busy.kind(), ErrorKind::Busy);

        let dup: LedgerError = DbError::duplicate("cards.card_number", "x").into();
        assert_eq!(dup.kind(), ErrorKind::Conflict);
        assert!(!dup.is_retryable());

        let internal: LedgerError = DbError::QueryFailed("boom".into()).into();
        assert_eq!(internal.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_rule_passthrough() {
        let err: LedgerError = CoreError::InsufficientBalance {
            card_number: "1234567890123456".into(),
            required: Money::from_cents(100),
            available: Money::from_cents(50),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(
            err.to_string(),
            "Insufficient balance on card 1234567890123456: required $1.00, available $0.50"
        );
        assert!(matches!(err.rule(), Some(CoreError::InsufficientBalance { .. })));
    }
}
