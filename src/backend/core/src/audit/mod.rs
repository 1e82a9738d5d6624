//! Audit trail: recording, querying, and aggregating authorization-relevant
//! actions.
//!
//! Recording is best-effort by design: a failed audit write is logged to
//! process output and swallowed, never aborting or rolling back the business
//! operation it describes. Writes are synchronous (no queue), so an entry is
//! always causally *after* the action it records.

pub mod models;

pub use models::{
    is_sensitive_field, redact_value, AuditEvent, AuditFilter, AuditLogEntry, AuditOutcome,
    AuditStats, CountedBucket,
};

use std::sync::Arc;

use tracing::error;

use crate::error::Result;
use crate::pagination::Page;
use crate::repository::AuditStore;

/// Records and serves the audit trail.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Durably record an event, best-effort.
    ///
    /// At-most-once: if the store rejects the entry it is lost, and the
    /// only trace is an error log. Audit completeness is secondary to
    /// request availability.
    pub async fn record(&self, event: AuditEvent) {
        let entry = event.build();
        if let Err(e) = self.store.append(&entry).await {
            error!(
                action = %entry.action,
                resource_type = %entry.resource_type,
                request_id = ?entry.request_id,
                error = %e,
                "Failed to persist audit entry"
            );
        }
    }

    /// Paginated query over the trail, newest first.
    pub async fn query(
        &self,
        filter: &AuditFilter,
        page: &Page,
    ) -> Result<(Vec<AuditLogEntry>, u64)> {
        self.store.query(filter, page).await
    }

    /// Aggregate statistics for compliance dashboards.
    pub async fn stats(&self, filter: &AuditFilter) -> Result<AuditStats> {
        self.store.stats(filter).await
    }
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder").finish()
    }
}
