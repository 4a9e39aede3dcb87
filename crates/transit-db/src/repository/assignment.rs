//! # Assignment Repository
//!
//! Trip grants. Purchase assignments are inserted inside a
//! [`LedgerUnit`](crate::unit::LedgerUnit) next to their debit; admin
//! assignments come through [`AssignmentRepository::insert`].
//!
//! ## Lookup Axes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  assignments                                                           │
//! │   ├── by account_id  (rider history)       idx_assignments_account     │
//! │   ├── by staff_id    (workload)            idx_assignments_staff       │
//! │   ├── by vehicle_id  (vehicle load)        idx_assignments_vehicle     │
//! │   └── all, paged, newest first                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::ASSIGNMENT_COLUMNS;
use crate::error::DbResult;
use transit_core::{Assignment, AssignmentUpdate, Page};

/// Repository for assignment database operations.
#[derive(Debug, Clone)]
pub struct AssignmentRepository {
    pool: SqlitePool,
}

impl AssignmentRepository {
    /// Creates a new AssignmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AssignmentRepository { pool }
    }

    /// Inserts an assignment outside any ledger unit (admin path).
    pub async fn insert(&self, assignment: &Assignment) -> DbResult<()> {
        debug!(id = %assignment.id, account_id = %assignment.account_id, "Inserting assignment");

        sqlx::query(
            r#"
            INSERT INTO assignments (
                id, account_id, staff_id, vehicle_id, route_id,
                transaction_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&assignment.id)
        .bind(&assignment.account_id)
        .bind(&assignment.staff_id)
        .bind(&assignment.vehicle_id)
        .bind(&assignment.route_id)
        .bind(assignment.transaction_id)
        .bind(assignment.created_at)
        .bind(assignment.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an assignment by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Assignment>> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?1");
        let assignment = sqlx::query_as::<_, Assignment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(assignment)
    }

    /// Applies a partial update to staff, vehicle and route.
    pub async fn update(&self, id: &str, update: &AssignmentUpdate) -> DbResult<Option<Assignment>> {
        debug!(id = %id, ?update, "Updating assignment");

        let sql = format!(
            "UPDATE assignments SET \
                 staff_id = COALESCE(?1, staff_id), \
                 vehicle_id = COALESCE(?2, vehicle_id), \
                 route_id = COALESCE(?3, route_id), \
                 updated_at = ?4 \
             WHERE id = ?5 \
             RETURNING {ASSIGNMENT_COLUMNS}"
        );
        let assignment = sqlx::query_as::<_, Assignment>(&sql)
            .bind(update.staff_id.as_deref())
            .bind(update.vehicle_id.as_deref())
            .bind(update.route_id.as_deref())
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(assignment)
    }

    /// Deletes an assignment. Returns false when it did not exist.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        debug!(id = %id, "Deleting assignment");

        let result = sqlx::query("DELETE FROM assignments WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Assignments of one rider, oldest first.
    pub async fn list_by_account(&self, account_id: &str) -> DbResult<Vec<Assignment>> {
        self.list_by_column("account_id", account_id).await
    }

    /// Assignments handled by one staff member, oldest first.
    pub async fn list_by_staff(&self, staff_id: &str) -> DbResult<Vec<Assignment>> {
        self.list_by_column("staff_id", staff_id).await
    }

    /// Assignments on one vehicle, oldest first.
    pub async fn list_by_vehicle(&self, vehicle_id: &str) -> DbResult<Vec<Assignment>> {
        self.list_by_column("vehicle_id", vehicle_id).await
    }

    /// Every assignment, newest first.
    pub async fn list_all(&self, page: Page) -> DbResult<Vec<Assignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?1 OFFSET ?2"
        );
        let rows = sqlx::query_as::<_, Assignment>(&sql)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Number of assignments handled by a staff member.
    pub async fn count_by_staff(&self, staff_id: &str) -> DbResult<i64> {
        self.count_by_column("staff_id", staff_id).await
    }

    /// Number of assignments on a vehicle.
    pub async fn count_by_vehicle(&self, vehicle_id: &str) -> DbResult<i64> {
        self.count_by_column("vehicle_id", vehicle_id).await
    }

    // `column` is always one of the fixed names above, never caller input.
    async fn list_by_column(&self, column: &'static str, value: &str) -> DbResult<Vec<Assignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE {column} = ?1 \
             ORDER BY created_at, id"
        );
        let rows = sqlx::query_as::<_, Assignment>(&sql)
            .bind(value)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn count_by_column(&self, column: &'static str, value: &str) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM assignments WHERE {column} = ?1");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
