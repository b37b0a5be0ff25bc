//! Steps shared by every operator mutation.
//!
//! Order is fixed: shape validation, authorization, rate limit, lock + load,
//! transition check, apply + audit in one unit of work, then publish. Every
//! path writes exactly one audit entry and reports through
//! `MutationResponse`; nothing escapes as an error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::common::{Actor, Capability};
use crate::domains::exceptions::errors::{ErrorCode, MutationError};
use crate::domains::exceptions::events::{LifecycleEvent, MutationOutcome};
use crate::domains::exceptions::machines::Denial;
use crate::domains::exceptions::models::{
    AuditEntry, AuditResult, ExceptionRecord, OperationType, RetryAttempt, StatusChange,
};
use crate::kernel::{AttemptWrite, ExceptionSnapshot, ServerDeps, StoreError, UnitOfWork};

/// Result of one mutation call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub success: bool,
    pub transaction_id: String,
    pub operation_id: String,
    pub timestamp: DateTime<Utc>,
    pub performed_by: String,
    /// Post-mutation snapshot, present on success
    pub exception: Option<ExceptionRecord>,
    /// Created or updated retry attempt, when the mutation touched one
    pub attempt: Option<RetryAttempt>,
    pub errors: Vec<MutationError>,
}

impl MutationResponse {
    pub fn error_codes(&self) -> Vec<ErrorCode> {
        self.errors.iter().map(|e| e.code).collect()
    }
}

/// State produced by an operation's apply step, before commit
pub(crate) struct Applied {
    pub exception: ExceptionRecord,
    pub attempt: Option<AttemptWrite>,
    pub status_change: Option<StatusChange>,
    /// Published after commit, in order
    pub events: Vec<LifecycleEvent>,
}

struct Failure {
    error: MutationError,
    /// Row as loaded, for failures that got past the lock
    snapshot: Option<ExceptionRecord>,
}

impl Failure {
    fn store(err: StoreError) -> Self {
        Self {
            error: MutationError::new(ErrorCode::DatabaseError, err.to_string()),
            snapshot: None,
        }
    }
}

impl From<Denial> for MutationError {
    fn from(denial: Denial) -> Self {
        MutationError::new(denial.code, denial.message)
    }
}

/// One in-flight mutation
pub(crate) struct Mutation<'a> {
    deps: &'a ServerDeps,
    actor: &'a Actor,
    operation: OperationType,
    capability: Capability,
    transaction_id: &'a str,
    operation_id: String,
    /// Call start; names the operation and stamps failures
    timestamp: DateTime<Utc>,
    rate_limited: bool,
}

impl<'a> Mutation<'a> {
    pub fn new(
        deps: &'a ServerDeps,
        actor: &'a Actor,
        operation: OperationType,
        capability: Capability,
        transaction_id: &'a str,
    ) -> Self {
        let timestamp = Utc::now();
        Self {
            deps,
            actor,
            operation,
            capability,
            transaction_id,
            operation_id: operation.operation_id(transaction_id, timestamp),
            timestamp,
            rate_limited: true,
        }
    }

    /// One item of a bulk call. Audited under the bulk operation type; the
    /// bulk call itself already counted against the rate limit.
    pub fn bulk_item(
        deps: &'a ServerDeps,
        actor: &'a Actor,
        bulk_operation: OperationType,
        capability: Capability,
        transaction_id: &'a str,
    ) -> Self {
        Self {
            rate_limited: false,
            ..Self::new(deps, actor, bulk_operation, capability, transaction_id)
        }
    }

    pub async fn run<F>(self, shape_errors: Vec<MutationError>, apply: F) -> MutationResponse
    where
        F: FnOnce(&ExceptionSnapshot, &str, DateTime<Utc>) -> Result<Applied, Denial> + Send,
    {
        if !shape_errors.is_empty() {
            debug!(
                operation_id = %self.operation_id,
                errors = shape_errors.len(),
                "Mutation input failed validation"
            );
            return self.fail(shape_errors, None).await;
        }

        if let Err(e) = self.actor.can(self.capability).check() {
            warn!(
                operation_id = %self.operation_id,
                user = %self.actor.user_id(),
                error = %e,
                "Mutation not authorized"
            );
            return self.fail(vec![e.into()], None).await;
        }

        if self.rate_limited {
            if let Err(e) = self
                .deps
                .rate_limiter
                .check(self.actor.user_id(), self.operation.as_str())
            {
                return self
                    .fail(
                        vec![MutationError::new(ErrorCode::RateLimitExceeded, e.to_string())],
                        None,
                    )
                    .await;
            }
        }

        let deadline = self.deps.settings.operation_timeout;
        match tokio::time::timeout(deadline, self.apply_locked(apply)).await {
            Ok(Ok((applied, committed_at))) => self.succeed(applied, committed_at),
            Ok(Err(failure)) => self.fail(vec![failure.error], failure.snapshot).await,
            Err(_) => {
                warn!(
                    operation_id = %self.operation_id,
                    timeout_ms = deadline.as_millis() as u64,
                    "Mutation timed out"
                );
                let error = MutationError::new(
                    ErrorCode::OperationTimeout,
                    format!("Operation timed out after {}ms", deadline.as_millis()),
                );
                self.fail(vec![error], None).await
            }
        }
    }

    /// Lock, check, apply, commit. The guard is released on every return.
    ///
    /// Row timestamps are taken once the lock is held, so history and audit
    /// order by time matches commit order.
    async fn apply_locked<F>(&self, apply: F) -> Result<(Applied, DateTime<Utc>), Failure>
    where
        F: FnOnce(&ExceptionSnapshot, &str, DateTime<Utc>) -> Result<Applied, Denial> + Send,
    {
        let guard = match self.deps.store.lock(self.transaction_id).await {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                return Err(Failure {
                    error: MutationError::new(
                        ErrorCode::ExceptionNotFound,
                        format!("Exception not found for transaction: {}", self.transaction_id),
                    ),
                    snapshot: None,
                })
            }
            Err(e) => {
                error!(transaction_id = %self.transaction_id, error = %e, "Failed to lock exception");
                return Err(Failure::store(e));
            }
        };

        let committed_at = Utc::now();
        let applied = match apply(guard.snapshot(), self.actor.user_id(), committed_at) {
            Ok(applied) => applied,
            Err(denial) => {
                let snapshot = guard.snapshot().exception.clone();
                drop(guard);
                warn!(
                    operation_id = %self.operation_id,
                    code = %denial.code,
                    "Transition denied"
                );
                return Err(Failure {
                    error: denial.into(),
                    snapshot: Some(snapshot),
                });
            }
        };

        let work = UnitOfWork {
            exception: applied.exception.clone(),
            attempt: applied.attempt.clone(),
            status_change: applied.status_change.clone(),
            audit: Some(AuditEntry::success(
                &self.operation_id,
                self.operation,
                self.transaction_id,
                self.actor.user_id(),
                committed_at,
            )),
        };

        if let Err(e) = guard.commit(work).await {
            error!(operation_id = %self.operation_id, error = %e, "Failed to commit mutation");
            return Err(Failure::store(e));
        }

        Ok((applied, committed_at))
    }

    fn succeed(&self, applied: Applied, committed_at: DateTime<Utc>) -> MutationResponse {
        info!(
            operation_id = %self.operation_id,
            transaction_id = %self.transaction_id,
            status = %applied.exception.status,
            "Mutation committed"
        );

        let Applied {
            exception,
            attempt,
            events,
            ..
        } = applied;

        for event in events {
            self.publish(event);
        }
        self.publish(LifecycleEvent::mutation_completed(
            self.transaction_id,
            Some(&exception),
            self.outcome(true, None),
        ));

        MutationResponse {
            success: true,
            transaction_id: self.transaction_id.to_string(),
            operation_id: self.operation_id.clone(),
            timestamp: committed_at,
            performed_by: self.actor.user_id().to_string(),
            exception: Some(exception),
            attempt: attempt.map(|w| w.attempt().clone()),
            errors: Vec::new(),
        }
    }

    async fn fail(
        &self,
        errors: Vec<MutationError>,
        snapshot: Option<ExceptionRecord>,
    ) -> MutationResponse {
        let (code, message) = errors
            .first()
            .map(|e| (e.code.as_str(), e.message.clone()))
            .unwrap_or(("UNKNOWN", String::new()));

        self.deps
            .audit
            .record(
                &self.operation_id,
                self.operation,
                self.transaction_id,
                self.actor.user_id(),
                AuditResult::Error,
                Some((code, &message)),
            )
            .await;

        self.publish(LifecycleEvent::mutation_completed(
            self.transaction_id,
            snapshot.as_ref(),
            self.outcome(false, Some(message)),
        ));

        MutationResponse {
            success: false,
            transaction_id: self.transaction_id.to_string(),
            operation_id: self.operation_id.clone(),
            timestamp: self.timestamp,
            performed_by: self.actor.user_id().to_string(),
            exception: None,
            attempt: None,
            errors,
        }
    }

    fn outcome(&self, success: bool, message: Option<String>) -> MutationOutcome {
        MutationOutcome {
            mutation_type: self.operation,
            success,
            performed_by: self.actor.user_id().to_string(),
            operation_id: self.operation_id.clone(),
            message,
        }
    }

    fn publish(&self, event: LifecycleEvent) {
        publish(self.deps, event);
    }
}

/// Best-effort publish; failures are logged, never propagated
pub(crate) fn publish(deps: &ServerDeps, event: LifecycleEvent) {
    let kind = event.kind;
    let transaction_id = event.transaction_id.clone();
    match deps.publisher.publish(event) {
        Ok(delivered) => {
            debug!(%kind, %transaction_id, delivered, "Lifecycle event published")
        }
        Err(e) => {
            warn!(%kind, %transaction_id, error = %e, "Lifecycle event delivery failed")
        }
    }
}
