//! # Collaborators
//!
//! The ledger resolves accounts and checks staff, vehicles and routes through
//! these traits. Accounts, staff, vehicles and routes are owned by other
//! parts of the system; the ledger only reads them.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────────┐     ┌──────────────────────┐
//! │ CardService  │────►│ AccountDirectory   │◄────│ SqliteDirectory      │
//! │ TripWorkflow │────►│ ReferenceData      │◄────│ (reference tables)   │
//! └──────────────┘     └────────────────────┘     └──────────────────────┘
//! ```

use async_trait::async_trait;

use transit_db::ReferenceRepository;

use crate::error::LedgerResult;

/// Account lookups.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn account_exists(&self, account_id: &str) -> LedgerResult<bool>;

    /// Maps an identity document to an account id.
    async fn resolve_account_by_document(&self, document: &str) -> LedgerResult<Option<String>>;
}

/// Staff, vehicle and route lookups.
#[async_trait]
pub trait ReferenceData: Send + Sync {
    /// Staff ids that may be assigned to a trip.
    async fn list_eligible_staff(&self) -> LedgerResult<Vec<String>>;

    async fn vehicle_exists(&self, vehicle_id: &str) -> LedgerResult<bool>;

    async fn route_exists(&self, route_id: &str) -> LedgerResult<bool>;
}

// =============================================================================
// SQLite-backed Directory
// =============================================================================

/// Both collaborator traits over the reference tables in the ledger store.
#[derive(Debug, Clone)]
pub struct SqliteDirectory {
    repo: ReferenceRepository,
}

impl SqliteDirectory {
    pub fn new(repo: ReferenceRepository) -> Self {
        SqliteDirectory { repo }
    }
}

#[async_trait]
impl AccountDirectory for SqliteDirectory {
    async fn account_exists(&self, account_id: &str) -> LedgerResult<bool> {
        Ok(self.repo.account_exists(account_id).await?)
    }

    async fn resolve_account_by_document(&self, document: &str) -> LedgerResult<Option<String>> {
        Ok(self.repo.account_by_document(document.trim()).await?)
    }
}

#[async_trait]
impl ReferenceData for SqliteDirectory {
    async fn list_eligible_staff(&self) -> LedgerResult<Vec<String>> {
        Ok(self.repo.eligible_staff().await?)
    }

    async fn vehicle_exists(&self, vehicle_id: &str) -> LedgerResult<bool> {
        Ok(self.repo.vehicle_exists(vehicle_id).await?)
    }

    async fn route_exists(&self, route_id: &str) -> LedgerResult<bool> {
        Ok(self.repo.route_exists(route_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
