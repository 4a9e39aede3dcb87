//! # Reference Repository
//!
//! Read-only lookups over the tables owned by the outer system (accounts,
//! staff, vehicles, routes), plus the insert helpers used by the `seed`
//! binary and by tests.
//!
//! ## Eligibility
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  account_exists   → row present                                        │
//! │  eligible_staff   → status = 'active'                                  │
//! │  vehicle_exists   → row present AND status = 'active'                  │
//! │  route_exists     → row present AND status = 'active'                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

// =============================================================================
// Records
// =============================================================================

/// A rider or administrator account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccountRecord {
    pub id: String,
    pub document: String,
    pub full_name: String,
}

/// A staff member who can be assigned to a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StaffRecord {
    pub id: String,
    pub full_name: String,
    pub role: String,
    pub status: String,
}

/// A vehicle (metro car, tram, cable car).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VehicleRecord {
    pub id: String,
    pub kind: String,
    pub plate: String,
    pub capacity: i64,
    pub status: String,
}

/// A route between two stations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RouteRecord {
    pub id: String,
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub status: String,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for reference data.
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    pool: SqlitePool,
}

impl ReferenceRepository {
    /// Creates a new ReferenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReferenceRepository { pool }
    }

    /// Checks whether an account id exists.
    pub async fn account_exists(&self, account_id: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = ?1)")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Resolves an identity document to an account id.
    pub async fn account_by_document(&self, document: &str) -> DbResult<Option<String>> {
        let id: Option<String> = sqlx::query_scalar("SELECT id FROM accounts WHERE document = ?1")
            .bind(document)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// Ids of every active staff member, in id order.
    pub async fn eligible_staff(&self) -> DbResult<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM staff WHERE status = 'active' ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    /// Checks whether a staff member exists and is active.
    pub async fn staff_eligible(&self, staff_id: &str) -> DbResult<bool> {
        self.active_exists("staff", staff_id).await
    }

    /// Checks whether a vehicle exists and is in service.
    pub async fn vehicle_exists(&self, vehicle_id: &str) -> DbResult<bool> {
        self.active_exists("vehicles", vehicle_id).await
    }

    /// Checks whether a route exists and is in service.
    pub async fn route_exists(&self, route_id: &str) -> DbResult<bool> {
        self.active_exists("routes", route_id).await
    }

    async fn active_exists(&self, table: &'static str, id: &str) -> DbResult<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1 AND status = 'active')");
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    // -------------------------------------------------------------------------
    // Seeding
    // -------------------------------------------------------------------------

    /// Inserts an account unless its id is already present.
    pub async fn insert_account(&self, account: &AccountRecord) -> DbResult<bool> {
        debug!(id = %account.id, "Seeding account");
        let result = sqlx::query(
            "INSERT OR IGNORE INTO accounts (id, document, full_name) VALUES (?1, ?2, ?3)",
        )
        .bind(&account.id)
        .bind(&account.document)
        .bind(&account.full_name)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Inserts a staff member unless present.
    pub async fn insert_staff(&self, staff: &StaffRecord) -> DbResult<bool> {
        debug!(id = %staff.id, "Seeding staff");
        let result = sqlx::query(
            "INSERT OR IGNORE INTO staff (id, full_name, role, status) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&staff.id)
        .bind(&staff.full_name)
        .bind(&staff.role)
        .bind(&staff.status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Inserts a vehicle unless present.
    pub async fn insert_vehicle(&self, vehicle: &VehicleRecord) -> DbResult<bool> {
        debug!(id = %vehicle.id, "Seeding vehicle");
        let result = sqlx::query(
            "INSERT OR IGNORE INTO vehicles (id, kind, plate, capacity, status) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&vehicle.id)
        .bind(&vehicle.kind)
        .bind(&vehicle.plate)
        .bind(vehicle.capacity)
        .bind(&vehicle.status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Inserts a route unless present.
    pub async fn insert_route(&self, route: &RouteRecord) -> DbResult<bool> {
        debug!(id = %route.id, "Seeding route");
        let result = sqlx::query(
            "INSERT OR IGNORE INTO routes (id, name, origin, destination, status) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&route.id)
        .bind(&route.name)
        .bind(&route.origin)
        .bind(&route.destination)
        .bind(&route.status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
