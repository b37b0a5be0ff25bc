// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Transition rules live in domains/exceptions/machines; the pipeline in
// domains/exceptions/actions drives these traits.
//
// Naming convention: Base* for trait names (e.g., BaseExceptionStore)

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domains::exceptions::events::LifecycleEvent;
use crate::domains::exceptions::models::{
    AuditEntry, ExceptionFilter, ExceptionRecord, RetryAttempt, StatusChange,
};

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Exception already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Event publisher unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Exception Store (per-row locking + atomic unit of work)
// =============================================================================

/// Exception row plus its retry attempts, as read under the row lock
#[derive(Debug, Clone)]
pub struct ExceptionSnapshot {
    pub exception: ExceptionRecord,
    /// Ordered by attempt number
    pub attempts: Vec<RetryAttempt>,
}

/// Retry attempt write carried by a unit of work
#[derive(Debug, Clone)]
pub enum AttemptWrite {
    Insert(RetryAttempt),
    Update(RetryAttempt),
}

impl AttemptWrite {
    pub fn attempt(&self) -> &RetryAttempt {
        match self {
            AttemptWrite::Insert(attempt) | AttemptWrite::Update(attempt) => attempt,
        }
    }
}

/// Everything one accepted mutation writes, committed all-or-nothing
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    pub exception: ExceptionRecord,
    pub attempt: Option<AttemptWrite>,
    pub status_change: Option<StatusChange>,
    pub audit: Option<AuditEntry>,
}

/// Exclusive hold on one exception row.
///
/// Dropping the guard without committing releases the lock and discards
/// the work.
#[async_trait]
pub trait BaseRowGuard: Send {
    fn snapshot(&self) -> &ExceptionSnapshot;

    async fn commit(self: Box<Self>, work: UnitOfWork) -> Result<(), StoreError>;
}

#[async_trait]
pub trait BaseExceptionStore: Send + Sync {
    /// Lock the row for `transaction_id`. `None` when no such exception exists.
    async fn lock(&self, transaction_id: &str) -> Result<Option<Box<dyn BaseRowGuard>>, StoreError>;

    /// Insert a new exception with its initial status change.
    /// Fails with `AlreadyExists` when the transaction id is taken.
    async fn insert(
        &self,
        exception: ExceptionRecord,
        status_change: StatusChange,
    ) -> Result<(), StoreError>;

    async fn find(&self, transaction_id: &str) -> Result<Option<ExceptionRecord>, StoreError>;

    async fn list(&self, filter: &ExceptionFilter) -> Result<Vec<ExceptionRecord>, StoreError>;

    /// Retry attempts keyed by transaction id, each list ordered by attempt number
    async fn attempts_for(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Vec<RetryAttempt>>, StoreError>;

    /// Status history keyed by transaction id, each list in commit order
    async fn status_history_for(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Vec<StatusChange>>, StoreError>;

    /// Reachability check for health reporting
    async fn ping(&self) -> Result<(), StoreError>;
}

// =============================================================================
// Audit Log
// =============================================================================

/// Append-only sink for mutation audit entries
#[async_trait]
pub trait BaseAuditLogWriter: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError>;

    /// Entries for one transaction id in append order
    async fn entries_for(&self, transaction_id: &str) -> Result<Vec<AuditEntry>, StoreError>;
}

// =============================================================================
// Lifecycle Event Publisher
// =============================================================================

/// Non-blocking lifecycle event sink
pub trait BaseEventPublisher: Send + Sync {
    /// Publish one event; returns the number of subscribers it was delivered to
    fn publish(&self, event: LifecycleEvent) -> Result<usize, PublishError>;
}
