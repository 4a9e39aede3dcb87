//! # transit-core: Pure Domain Logic for the Transit Ledger
//!
//! This crate holds the rules every other crate builds on: what a card is,
//! how money is represented, which transaction kinds carry which sign, and
//! what the flat fare is. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Transit Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Presentation layer (HTTP / CLI, external)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          transit-ledger (CardService, TripWorkflow, Audit)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ transit-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   fare    │  │ validation│  │   │
//! │  │   │   Card    │  │   Money   │  │ FarePolicy│  │   rules   │  │   │
//! │  │   │Transaction│  │           │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 transit-db (Ledger Store, SQLite)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Card, Transaction, Assignment, AuditEntry)
//! - [`money`] - Money type with integer minor units
//! - [`fare`] - Flat fare policy
//! - [`error`] - Domain error types and the error taxonomy
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use transit_core::money::Money;
//! use transit_core::types::TransactionKind;
//!
//! let fare = Money::from_cents(2500);
//!
//! // A purchase is always recorded as a debit
//! let signed = TransactionKind::Purchase.signed(fare).unwrap();
//! assert_eq!(signed.cents(), -2500);
//! ```

pub mod error;
pub mod fare;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use fare::FarePolicy;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of decimal digits in a card number.
pub const CARD_NUMBER_LEN: usize = 16;

/// Flat trip fare in minor units when no configuration overrides it.
pub const DEFAULT_FARE_CENTS: i64 = 2500;

/// Default page size for listing endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Upper bound for a single page.
pub const MAX_PAGE_SIZE: u32 = 1000;
