//! # transit-ledger: Stored-Value Card Services
//!
//! The layer a presentation surface calls into. Every balance change goes
//! through a guarded, atomic [`transit_db::LedgerUnit`] and is recorded as an
//! immutable transaction; audit entries follow on a best-effort basis.
//!
//! ## Module Structure
//! ```text
//! transit_ledger/
//! ├── config.rs        ◄─── LedgerConfig (TOML + TRANSIT_* env)
//! ├── error.rs         ◄─── LedgerError, LedgerResult
//! ├── collaborators.rs ◄─── AccountDirectory, ReferenceData
//! ├── selector.rs      ◄─── card numbers, staff picks (seedable)
//! ├── retry.rs         ◄─── busy retry with linear backoff
//! ├── recorder.rs      ◄─── TransactionRecorder
//! ├── audit.rs         ◄─── AuditRecorder, AuditSink, AuditFailure
//! ├── card.rs          ◄─── CardService
//! ├── trip.rs          ◄─── TripWorkflow
//! └── ledger.rs        ◄─── Ledger (wiring)
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let ledger = Ledger::open(&LedgerConfig::load(Some(path))?).await?;
//! let card = ledger.cards().issue("admin", "acct-1", CardClass::Standard, Money::zero()).await?;
//! ledger.cards().credit("acct-1", &card.card_number, Money::from_cents(5000)).await?;
//! let receipt = ledger.trips().purchase("acct-1", &request).await?;
//! ```

pub mod audit;
pub mod card;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod ledger;
pub mod recorder;
pub mod retry;
pub mod selector;
pub mod trip;

#[cfg(test)]
pub(crate) mod testing;

pub use audit::{AuditFailure, AuditRecorder, AuditSink, SqliteAuditSink};
pub use card::CardService;
pub use collaborators::{AccountDirectory, ReferenceData, SqliteDirectory};
pub use config::{DatabaseSettings, LedgerConfig, LedgerSettings};
pub use error::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use recorder::TransactionRecorder;
pub use retry::{with_busy_retry, RetryPolicy};
pub use selector::Selector;
pub use trip::{PurchaseRequest, TripReceipt, TripWorkflow};
