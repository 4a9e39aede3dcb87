//! # Audit Recorder
//!
//! Best-effort audit trail. An audit write happens after the operation it
//! describes has committed and can never undo it.
//!
//! ## Failure Reporting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  operation committed                                                   │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  AuditRecorder::log ──► AuditSink::append                              │
//! │        │                     │                                          │
//! │        │                     ├── Ok(entry)  → Some(entry)              │
//! │        │                     └── Err(e)     → error! log               │
//! │        │                                      failures += 1            │
//! │        │                                      try_send(AuditFailure)   │
//! │        ▼                                      None                     │
//! │  operation result returned unchanged                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The failure channel is bounded; when nobody drains it, further failures
//! are still counted and logged but not queued.
//!
//! Descriptions longer than `MAX_DESCRIPTION_LEN` bytes are cut at a char
//! boundary rather than rejected, so a long adjustment reason still leaves
//! an entry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use transit_core::validation::{validate_description, validate_resource, MAX_DESCRIPTION_LEN};
use transit_core::{AuditAction, AuditEntry, Page};
use transit_db::AuditRepository;

use crate::error::LedgerResult;

// =============================================================================
// Sink
// =============================================================================

/// Where audit entries are stored.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(
        &self,
        actor_id: &str,
        resource: &str,
        action: AuditAction,
        description: &str,
    ) -> LedgerResult<AuditEntry>;

    async fn list(&self, page: Page, action: Option<AuditAction>) -> LedgerResult<Vec<AuditEntry>>;

    async fn list_for_actor(&self, actor_id: &str, page: Page) -> LedgerResult<Vec<AuditEntry>>;
}

/// Audit sink over the `audit_log` table.
#[derive(Debug, Clone)]
pub struct SqliteAuditSink {
    repo: AuditRepository,
}

impl SqliteAuditSink {
    pub fn new(repo: AuditRepository) -> Self {
        SqliteAuditSink { repo }
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    async fn append(
        &self,
        actor_id: &str,
        resource: &str,
        action: AuditAction,
        description: &str,
    ) -> LedgerResult<AuditEntry> {
        Ok(self.repo.insert(actor_id, resource, action, description).await?)
    }

    async fn list(&self, page: Page, action: Option<AuditAction>) -> LedgerResult<Vec<AuditEntry>> {
        Ok(self.repo.list(page, action).await?)
    }

    async fn list_for_actor(&self, actor_id: &str, page: Page) -> LedgerResult<Vec<AuditEntry>> {
        Ok(self.repo.list_for_actor(actor_id, page).await?)
    }
}

// =============================================================================
// Failure Report
// =============================================================================

/// An audit entry that could not be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFailure {
    pub actor_id: String,
    pub resource: String,
    pub action: AuditAction,
    pub description: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

// =============================================================================
// Recorder
// =============================================================================

/// Writes audit entries without ever failing the caller.
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    failures: AtomicU64,
    reports: Option<mpsc::Sender<AuditFailure>>,
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("failures", &self.failure_count())
            .field("reporting", &self.reports.is_some())
            .finish()
    }
}

impl AuditRecorder {
    /// Recorder without a failure channel.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        AuditRecorder {
            sink,
            failures: AtomicU64::new(0),
            reports: None,
        }
    }

    /// Recorder that also queues each failure on a bounded channel.
    pub fn with_failure_channel(
        sink: Arc<dyn AuditSink>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<AuditFailure>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let recorder = AuditRecorder {
            sink,
            failures: AtomicU64::new(0),
            reports: Some(tx),
        };
        (recorder, rx)
    }

    /// Writes one entry. Returns `None` when the write failed.
    pub async fn log(
        &self,
        actor_id: &str,
        resource: &str,
        action: AuditAction,
        description: impl Into<String>,
    ) -> Option<AuditEntry> {
        let description = clamp_description(description.into());

        let result = match validate_resource(resource).and_then(|_| validate_description(&description)) {
            Ok(()) => self.sink.append(actor_id, resource, action, &description).await,
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(entry) => {
                debug!(id = entry.id, actor_id = %actor_id, action = %action, "Audit entry written");
                Some(entry)
            }
            Err(e) => {
                let total = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
                error!(
                    actor_id = %actor_id,
                    resource = %resource,
                    action = %action,
                    error = %e,
                    failures = total,
                    "Audit write failed"
                );
                self.report(AuditFailure {
                    actor_id: actor_id.to_string(),
                    resource: resource.to_string(),
                    action,
                    description,
                    error: e.to_string(),
                    failed_at: Utc::now(),
                });
                None
            }
        }
    }

    fn report(&self, failure: AuditFailure) {
        let Some(tx) = &self.reports else {
            return;
        };
        match tx.try_send(failure) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Audit failure channel full, report dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Audit failure channel closed");
            }
        }
    }

    /// Audit writes that failed since start-up.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Entries newest first, optionally for one action.
    pub async fn list(&self, page: Page, action: Option<AuditAction>) -> LedgerResult<Vec<AuditEntry>> {
        self.sink.list(page, action).await
    }

    /// One actor's entries newest first.
    pub async fn list_for_actor(&self, actor_id: &str, page: Page) -> LedgerResult<Vec<AuditEntry>> {
        self.sink.list_for_actor(actor_id, page).await
    }
}

fn clamp_description(mut description: String) -> String {
    if description.len() > MAX_DESCRIPTION_LEN {
        let mut end = MAX_DESCRIPTION_LEN;
        while !description.is_char_boundary(end) {
            end -= 1;
        }
        description.truncate(end);
    }
    description
}

// =============================================================================
// Unit Tests
// =============================================================================
