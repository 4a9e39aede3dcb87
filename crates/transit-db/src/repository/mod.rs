//! # Repository Module
//!
//! Pool-backed repositories for the ledger relations and reference tables.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Reads vs Atomic Writes                               │
//! │                                                                         │
//! │  Service                                                               │
//! │       │                                                                 │
//! │       ├── db.cards().get_by_number(..)      ← single statement, pool   │
//! │       ├── db.transactions().list_for_card  ← single statement, pool   │
//! │       │                                                                 │
//! │       └── db.begin_unit()                   ← multi-statement writes   │
//! │             ├── unit.debit(..)              (guarded UPDATE first)     │
//! │             ├── unit.insert_transaction(..)                            │
//! │             ├── unit.insert_assignment(..)                             │
//! │             └── unit.commit()                                          │
//! │                                                                         │
//! │  A balance never moves outside a LedgerUnit.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CardRepository`](card::CardRepository) - Card lookups, listing, status and class updates
//! - [`TransactionRepository`](transaction::TransactionRepository) - Ledger history and sums
//! - [`AssignmentRepository`](assignment::AssignmentRepository) - Trip grants
//! - [`AuditRepository`](audit::AuditRepository) - Append-only audit log
//! - [`ReferenceRepository`](reference::ReferenceRepository) - Accounts, staff, vehicles, routes

pub mod assignment;
pub mod audit;
pub mod card;
pub mod reference;
pub mod transaction;

/// Column list shared by every query returning a `Card`.
pub(crate) const CARD_COLUMNS: &str = "id, card_number, account_id, card_class, status, \
     balance_cents, last_recharge_at, created_at, updated_at";

/// Column list shared by every query returning a `Transaction`.
pub(crate) const TRANSACTION_COLUMNS: &str = "id, card_number, kind, amount_cents, created_at";

/// Column list shared by every query returning an `Assignment`.
pub(crate) const ASSIGNMENT_COLUMNS: &str = "id, account_id, staff_id, vehicle_id, route_id, \
     transaction_id, created_at, updated_at";

/// Column list shared by every query returning an `AuditEntry`.
pub(crate) const AUDIT_COLUMNS: &str = "id, actor_id, resource, action, description, created_at";
