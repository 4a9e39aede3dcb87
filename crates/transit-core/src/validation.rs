//! # Validation Module
//!
//! Input validation run by the services before any storage access.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Service entry (THIS MODULE)                                  │
//! │  ├── Identifier and card number format                                 │
//! │  └── Amount sign rules (InvalidAmount)                                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Guarded UPDATE (transit-db)                                  │
//! │  └── balance_cents >= amount AND status = 'active'                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (balance_cents >= 0)                                        │
//! │  ├── UNIQUE (account_id), UNIQUE (card_number)                         │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use transit_core::validation::{validate_card_number, validate_positive_amount};
//! use transit_core::Money;
//!
//! validate_card_number("4000123412341234").unwrap();
//! validate_positive_amount(Money::from_cents(2500)).unwrap();
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::CARD_NUMBER_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest identifier accepted for accounts, staff, vehicles and routes.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Longest audit description stored.
pub const MAX_DESCRIPTION_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a card number.
///
/// ## Rules
/// - Exactly 16 characters
/// - ASCII digits only
///
/// ## Example
/// ```rust
/// use transit_core::validation::validate_card_number;
///
/// assert!(validate_card_number("0000111122223333").is_ok());
/// assert!(validate_card_number("1234").is_err());
/// assert!(validate_card_number("12345678901234ab").is_err());
/// ```
pub fn validate_card_number(card_number: &str) -> ValidationResult<()> {
    if card_number.is_empty() {
        return Err(ValidationError::Required {
            field: "card_number".to_string(),
        });
    }

    if card_number.len() != CARD_NUMBER_LEN || !card_number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "card_number".to_string(),
            reason: format!("must be exactly {} digits", CARD_NUMBER_LEN),
        });
    }

    Ok(())
}

/// Validates an opaque identifier (account, staff, vehicle, route, assignment).
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
/// - No whitespace
pub fn validate_identifier(field: &str, value: &str) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IDENTIFIER_LEN,
        });
    }

    if value.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates an identity document number used to look up an account.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - Letters and digits only
pub fn validate_document(document: &str) -> ValidationResult<()> {
    let document = document.trim();

    if document.is_empty() {
        return Err(ValidationError::Required {
            field: "document".to_string(),
        });
    }

    if document.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "document".to_string(),
            max: 20,
        });
    }

    if !document.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "document".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates an audited resource name (a table-like noun such as `cards`).
pub fn validate_resource(resource: &str) -> ValidationResult<()> {
    if resource.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "resource".to_string(),
        });
    }

    if resource.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "resource".to_string(),
            max: 20,
        });
    }

    Ok(())
}

/// Validates free-text audit or adjustment descriptions.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    if description.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "description".to_string(),
        });
    }

    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Amount Validators
// =============================================================================

/// Validates a recharge or debit magnitude.
///
/// ## Example
/// ```rust
/// use transit_core::validation::validate_positive_amount;
/// use transit_core::Money;
///
/// assert!(validate_positive_amount(Money::from_cents(1)).is_ok());
/// assert!(validate_positive_amount(Money::zero()).is_err());
/// ```
pub fn validate_positive_amount(amount: Money) -> CoreResult<()> {
    if !amount.is_positive() {
        return Err(CoreError::InvalidAmount {
            reason: format!("amount must be positive, got {}", amount),
        });
    }
    Ok(())
}

/// Validates the balance a card is issued with.
pub fn validate_seed_balance(amount: Money) -> CoreResult<()> {
    if amount.is_negative() {
        return Err(CoreError::InvalidAmount {
            reason: format!("initial balance must not be negative, got {}", amount),
        });
    }
    Ok(())
}

/// Validates an administrative adjustment.
pub fn validate_adjustment(amount: Money) -> CoreResult<()> {
    if amount.is_zero() {
        return Err(CoreError::InvalidAmount {
            reason: "adjustment must be non-zero".to_string(),
        });
    }
    // A negative adjustment's magnitude must itself be representable.
    if amount.cents() == i64::MIN {
        return Err(CoreError::InvalidAmount {
            reason: "adjustment is out of range".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
