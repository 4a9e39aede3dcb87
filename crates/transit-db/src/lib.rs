//! # transit-db: Ledger Store for the Transit Card Ledger
//!
//! This crate persists cards, transactions, assignments and audit entries in
//! SQLite and provides the atomic read-modify-write primitive
//! ([`LedgerUnit`]) every balance mutation goes through.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Transit Ledger Data Flow                            │
//! │                                                                         │
//! │  CardService / TripWorkflow (transit-ledger)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   transit-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  card, tx,    │    │  (embedded)  │  │   │
//! │  │   │               │◄───│  assignment,  │    │              │  │   │
//! │  │   │  SqlitePool   │    │  audit, ref   │    │ 001_ledger_  │  │   │
//! │  │   │  LedgerUnit   │    │               │    │  schema.sql  │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`unit`] - Atomic ledger units (guarded balance updates)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use transit_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("ledger.db")).await?;
//!
//! let mut unit = db.begin_unit().await?;
//! let outcome = unit.debit("4000123412341234", Money::from_cents(2500)).await?;
//! // ... record the transaction, then
//! unit.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod unit;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use unit::{BalanceUpdate, LedgerUnit};

// Repository re-exports for convenience
pub use repository::assignment::AssignmentRepository;
pub use repository::audit::AuditRepository;
pub use repository::card::CardRepository;
pub use repository::reference::{
    AccountRecord, ReferenceRepository, RouteRecord, StaffRecord, VehicleRecord,
};
pub use repository::transaction::TransactionRepository;
