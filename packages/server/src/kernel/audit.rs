//! Audit log writer.
//!
//! Wraps the append-only sink so a failed write is logged and swallowed at
//! the call site. A mutation never fails because its audit entry could not
//! be written.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::traits::{BaseAuditLogWriter, StoreError};
use crate::domains::exceptions::models::{AuditEntry, AuditResult, OperationType};

#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn BaseAuditLogWriter>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn BaseAuditLogWriter>) -> Self {
        Self { sink }
    }

    /// Append one entry. Returns whether the write succeeded.
    pub async fn record(
        &self,
        operation_id: &str,
        operation_type: OperationType,
        transaction_id: &str,
        performed_by: &str,
        result: AuditResult,
        error: Option<(&str, &str)>,
    ) -> bool {
        let now = Utc::now();
        let entry = match (result, error) {
            (AuditResult::Error, Some((code, detail))) => AuditEntry::error(
                operation_id,
                operation_type,
                transaction_id,
                performed_by,
                now,
                code,
                detail,
            ),
            (AuditResult::Error, None) => AuditEntry::error(
                operation_id,
                operation_type,
                transaction_id,
                performed_by,
                now,
                "UNKNOWN",
                "",
            ),
            (AuditResult::Success, _) => AuditEntry::success(
                operation_id,
                operation_type,
                transaction_id,
                performed_by,
                now,
            ),
        };
        self.append(entry).await
    }

    /// Append a prepared entry, swallowing failures
    pub async fn append(&self, entry: AuditEntry) -> bool {
        let operation_id = entry.operation_id.clone();
        match self.sink.append(entry).await {
            Ok(()) => {
                debug!(operation_id = %operation_id, "Audit entry written");
                true
            }
            Err(e) => {
                warn!(operation_id = %operation_id, error = %e, "Failed to write audit entry");
                false
            }
        }
    }

    pub async fn entries_for(&self, transaction_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        self.sink.entries_for(transaction_id).await
    }
}
