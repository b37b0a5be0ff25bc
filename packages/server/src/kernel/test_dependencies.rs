// Test doubles for kernel traits
//
// Recording and fault-injecting implementations used by unit and
// integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;

use super::memory_store::MemoryStore;
use super::traits::{
    BaseAuditLogWriter, BaseEventPublisher, BaseExceptionStore, BaseRowGuard, ExceptionSnapshot,
    PublishError, StoreError, UnitOfWork,
};
use crate::domains::exceptions::events::LifecycleEvent;
use crate::domains::exceptions::models::{
    AuditEntry, ExceptionFilter, ExceptionRecord, RetryAttempt, StatusChange,
};

// =============================================================================
// Audit
// =============================================================================

/// Audit sink whose writes always fail
#[derive(Default)]
pub struct FailingAuditWriter;

#[async_trait]
impl BaseAuditLogWriter for FailingAuditWriter {
    async fn append(&self, _entry: AuditEntry) -> Result<(), StoreError> {
        Err(anyhow!("audit sink unavailable").into())
    }

    async fn entries_for(&self, _transaction_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(Vec::new())
    }
}

// =============================================================================
// Publishers
// =============================================================================

/// Publisher that records every event for later inspection
#[derive(Default)]
pub struct RecordingPublisher {
    events: RwLock<Vec<LifecycleEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl BaseEventPublisher for RecordingPublisher {
    fn publish(&self, event: LifecycleEvent) -> Result<usize, PublishError> {
        self.events
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
        Ok(1)
    }
}

/// Publisher that is always down
#[derive(Default)]
pub struct FailingPublisher;

impl BaseEventPublisher for FailingPublisher {
    fn publish(&self, _event: LifecycleEvent) -> Result<usize, PublishError> {
        Err(PublishError::Unavailable("publisher offline".to_string()))
    }
}

// =============================================================================
// Store with injectable faults
// =============================================================================

/// Wraps a `MemoryStore`, optionally delaying lock acquisition or failing
/// every commit.
#[derive(Clone)]
pub struct FaultyStore {
    inner: MemoryStore,
    fail_commits: std::sync::Arc<AtomicBool>,
    lock_delay: Option<Duration>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_commits: std::sync::Arc::new(AtomicBool::new(false)),
            lock_delay: None,
        }
    }

    pub fn with_lock_delay(mut self, delay: Duration) -> Self {
        self.lock_delay = Some(delay);
        self
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

struct FailingGuard {
    inner: Box<dyn BaseRowGuard>,
}

#[async_trait]
impl BaseRowGuard for FailingGuard {
    fn snapshot(&self) -> &ExceptionSnapshot {
        self.inner.snapshot()
    }

    async fn commit(self: Box<Self>, _work: UnitOfWork) -> Result<(), StoreError> {
        // Inner guard dropped: nothing written, lock released
        Err(anyhow!("simulated commit failure").into())
    }
}

#[async_trait]
impl BaseExceptionStore for FaultyStore {
    async fn lock(&self, transaction_id: &str) -> Result<Option<Box<dyn BaseRowGuard>>, StoreError> {
        if let Some(delay) = self.lock_delay {
            tokio::time::sleep(delay).await;
        }
        let guard = self.inner.lock(transaction_id).await?;
        if self.fail_commits.load(Ordering::SeqCst) {
            return Ok(guard.map(|inner| Box::new(FailingGuard { inner }) as Box<dyn BaseRowGuard>));
        }
        Ok(guard)
    }

    async fn insert(
        &self,
        exception: ExceptionRecord,
        status_change: StatusChange,
    ) -> Result<(), StoreError> {
        self.inner.insert(exception, status_change).await
    }

    async fn find(&self, transaction_id: &str) -> Result<Option<ExceptionRecord>, StoreError> {
        self.inner.find(transaction_id).await
    }

    async fn list(&self, filter: &ExceptionFilter) -> Result<Vec<ExceptionRecord>, StoreError> {
        self.inner.list(filter).await
    }

    async fn attempts_for(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Vec<RetryAttempt>>, StoreError> {
        self.inner.attempts_for(transaction_ids).await
    }

    async fn status_history_for(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Vec<StatusChange>>, StoreError> {
        self.inner.status_history_for(transaction_ids).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}
