//! # Audit Repository
//!
//! Append-only storage for audit entries. Listing is newest first.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::AUDIT_COLUMNS;
use crate::error::DbResult;
use transit_core::{AuditAction, AuditEntry, Page};

/// Repository for the audit log.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends one entry and returns it with its assigned id.
    pub async fn insert(
        &self,
        actor_id: &str,
        resource: &str,
        action: AuditAction,
        description: &str,
    ) -> DbResult<AuditEntry> {
        debug!(actor_id = %actor_id, resource = %resource, action = %action, "Writing audit entry");

        let sql = format!(
            "INSERT INTO audit_log (actor_id, resource, action, description, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             RETURNING {AUDIT_COLUMNS}"
        );
        let entry = sqlx::query_as::<_, AuditEntry>(&sql)
            .bind(actor_id)
            .bind(resource)
            .bind(action)
            .bind(description)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
        Ok(entry)
    }

    /// Lists entries newest first, optionally restricted to one action.
    pub async fn list(&self, page: Page, action: Option<AuditAction>) -> DbResult<Vec<AuditEntry>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_log \
             WHERE (?1 IS NULL OR action = ?1) \
             ORDER BY id DESC \
             LIMIT ?2 OFFSET ?3"
        );
        let entries = sqlx::query_as::<_, AuditEntry>(&sql)
            .bind(action)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    /// Lists one actor's entries newest first.
    pub async fn list_for_actor(&self, actor_id: &str, page: Page) -> DbResult<Vec<AuditEntry>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_log \
             WHERE actor_id = ?1 \
             ORDER BY id DESC \
             LIMIT ?2 OFFSET ?3"
        );
        let entries = sqlx::query_as::<_, AuditEntry>(&sql)
            .bind(actor_id)
            .bind(i64::from(page.limit))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
