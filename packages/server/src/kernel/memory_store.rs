//! In-process exception store.
//!
//! Each exception row sits behind its own async mutex, so operations on the
//! same transaction id serialize while unrelated rows proceed in parallel.
//! The audit log shares the store so a row commit and its SUCCESS audit
//! entry land together.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::traits::{
    AttemptWrite, BaseAuditLogWriter, BaseExceptionStore, BaseRowGuard, ExceptionSnapshot,
    StoreError, UnitOfWork,
};
use crate::domains::exceptions::models::{
    AuditEntry, ExceptionFilter, ExceptionRecord, RetryAttempt, StatusChange,
};

struct Row {
    exception: ExceptionRecord,
    attempts: Vec<RetryAttempt>,
    history: Vec<StatusChange>,
}

type AuditLog = Arc<RwLock<Vec<AuditEntry>>>;

/// Thread-safe, cloneable in-memory store
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<RwLock<HashMap<String, Arc<Mutex<Row>>>>>,
    audit: AuditLog,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every audit entry in append order
    pub async fn all_audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.read().await.clone()
    }

    async fn row(&self, transaction_id: &str) -> Option<Arc<Mutex<Row>>> {
        self.rows.read().await.get(transaction_id).cloned()
    }

    async fn rows_for(&self, transaction_ids: &[String]) -> Vec<(String, Arc<Mutex<Row>>)> {
        let rows = self.rows.read().await;
        transaction_ids
            .iter()
            .filter_map(|id| rows.get(id).map(|row| (id.clone(), row.clone())))
            .collect()
    }
}

struct MemoryRowGuard {
    row: OwnedMutexGuard<Row>,
    snapshot: ExceptionSnapshot,
    audit: AuditLog,
}

#[async_trait]
impl BaseRowGuard for MemoryRowGuard {
    fn snapshot(&self) -> &ExceptionSnapshot {
        &self.snapshot
    }

    async fn commit(self: Box<Self>, work: UnitOfWork) -> Result<(), StoreError> {
        let MemoryRowGuard { mut row, audit, .. } = *self;

        // Resolve the attempt slot before touching anything
        let update_slot = match &work.attempt {
            Some(AttemptWrite::Update(attempt)) => Some(
                row.attempts
                    .iter()
                    .position(|a| a.id == attempt.id)
                    .ok_or_else(|| anyhow!("Retry attempt {} not found", attempt.id))?,
            ),
            _ => None,
        };

        // Last await: once the audit log is held every write below completes,
        // so a cancelled commit leaves the row untouched
        let mut audit_log = if work.audit.is_some() {
            Some(audit.write().await)
        } else {
            None
        };

        row.exception = work.exception;
        match work.attempt {
            Some(AttemptWrite::Insert(attempt)) => row.attempts.push(attempt),
            Some(AttemptWrite::Update(attempt)) => {
                if let Some(slot) = update_slot {
                    row.attempts[slot] = attempt;
                }
            }
            None => {}
        }
        if let Some(change) = work.status_change {
            row.history.push(change);
        }
        if let (Some(log), Some(entry)) = (audit_log.as_mut(), work.audit) {
            log.push(entry);
        }
        drop(audit_log);

        // Row lock released here
        drop(row);
        Ok(())
    }
}

#[async_trait]
impl BaseExceptionStore for MemoryStore {
    async fn lock(&self, transaction_id: &str) -> Result<Option<Box<dyn BaseRowGuard>>, StoreError> {
        let Some(row) = self.row(transaction_id).await else {
            return Ok(None);
        };

        let row = row.lock_owned().await;
        let mut attempts = row.attempts.clone();
        attempts.sort_by_key(|a| a.attempt_number);
        let snapshot = ExceptionSnapshot {
            exception: row.exception.clone(),
            attempts,
        };

        Ok(Some(Box::new(MemoryRowGuard {
            row,
            snapshot,
            audit: self.audit.clone(),
        })))
    }

    async fn insert(
        &self,
        exception: ExceptionRecord,
        status_change: StatusChange,
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&exception.transaction_id) {
            return Err(StoreError::AlreadyExists(exception.transaction_id));
        }
        rows.insert(
            exception.transaction_id.clone(),
            Arc::new(Mutex::new(Row {
                exception,
                attempts: Vec::new(),
                history: vec![status_change],
            })),
        );
        Ok(())
    }

    async fn find(&self, transaction_id: &str) -> Result<Option<ExceptionRecord>, StoreError> {
        match self.row(transaction_id).await {
            Some(row) => Ok(Some(row.lock().await.exception.clone())),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &ExceptionFilter) -> Result<Vec<ExceptionRecord>, StoreError> {
        let rows: Vec<Arc<Mutex<Row>>> = self.rows.read().await.values().cloned().collect();

        let mut matched = Vec::new();
        for row in rows {
            let exception = row.lock().await.exception.clone();
            if filter.matches(&exception) {
                matched.push(exception);
            }
        }
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.transaction_id.cmp(&b.transaction_id))
        });

        Ok(matched
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn attempts_for(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Vec<RetryAttempt>>, StoreError> {
        let mut map = HashMap::new();
        for (id, row) in self.rows_for(transaction_ids).await {
            let mut attempts = row.lock().await.attempts.clone();
            attempts.sort_by_key(|a| a.attempt_number);
            map.insert(id, attempts);
        }
        Ok(map)
    }

    async fn status_history_for(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Vec<StatusChange>>, StoreError> {
        let mut map = HashMap::new();
        for (id, row) in self.rows_for(transaction_ids).await {
            map.insert(id, row.lock().await.history.clone());
        }
        Ok(map)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl BaseAuditLogWriter for MemoryStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.audit.write().await.push(entry);
        Ok(())
    }

    async fn entries_for(&self, transaction_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(self
            .audit
            .read()
            .await
            .iter()
            .filter(|e| e.transaction_id == transaction_id)
            .cloned()
            .collect())
    }
}
