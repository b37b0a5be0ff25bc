//! Retry outcome reported by the executing system.
//!
//! Not an operator mutation: no capability check and no audit entry. The
//! transition still goes through the validator under the row lock.

use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};

use super::pipeline::publish;
use crate::domains::exceptions::errors::{ErrorCode, MutationError};
use crate::domains::exceptions::events::{ExceptionEventType, LifecycleEvent, RetryEventType};
use crate::domains::exceptions::machines::{check_transition, Denial, Operation};
use crate::domains::exceptions::models::{
    ExceptionRecord, RetryAttempt, RetryStatus, StatusChange,
};
use crate::kernel::{AttemptWrite, ServerDeps, UnitOfWork};

/// Actor recorded for changes that did not come from an operator
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOutcome {
    pub transaction_id: String,
    pub success: bool,
    pub message: Option<String>,
    pub response_code: Option<i32>,
}

/// Close the pending attempt and move the exception to RETRIED_SUCCESS or
/// RETRIED_FAILED.
pub async fn complete_retry(
    outcome: RetryOutcome,
    deps: &ServerDeps,
) -> Result<ExceptionRecord, MutationError> {
    let deadline = deps.settings.operation_timeout;
    let (exception, attempt) = tokio::time::timeout(deadline, apply_outcome(&outcome, deps))
        .await
        .map_err(|_| {
            MutationError::new(
                ErrorCode::OperationTimeout,
                format!("Operation timed out after {}ms", deadline.as_millis()),
            )
        })??;

    info!(
        transaction_id = %exception.transaction_id,
        attempt_number = attempt.attempt_number,
        status = %exception.status,
        "Retry outcome recorded"
    );

    let retry_kind = if outcome.success {
        RetryEventType::Completed
    } else {
        RetryEventType::Failed
    };
    publish(
        deps,
        LifecycleEvent::exception(ExceptionEventType::RetryCompleted, &exception, SYSTEM_ACTOR),
    );
    publish(
        deps,
        LifecycleEvent::retry(retry_kind, &exception, &attempt, SYSTEM_ACTOR),
    );

    Ok(exception)
}

async fn apply_outcome(
    outcome: &RetryOutcome,
    deps: &ServerDeps,
) -> Result<(ExceptionRecord, RetryAttempt), MutationError> {
    let guard = deps
        .store
        .lock(&outcome.transaction_id)
        .await
        .map_err(|e| {
            error!(transaction_id = %outcome.transaction_id, error = %e, "Failed to lock exception");
            MutationError::new(ErrorCode::DatabaseError, e.to_string())
        })?
        .ok_or_else(|| {
            MutationError::new(
                ErrorCode::ExceptionNotFound,
                format!("Exception not found for transaction: {}", outcome.transaction_id),
            )
        })?;

    let snapshot = guard.snapshot();
    let t = check_transition(
        &snapshot.exception,
        &snapshot.attempts,
        Operation::CompleteRetry {
            success: outcome.success,
        },
    )?;

    let mut attempt = snapshot
        .attempts
        .iter()
        .find(|a| a.is_pending())
        .cloned()
        .ok_or_else(|| Denial::new(ErrorCode::NoPendingRetry, "No pending retry to complete"))?;

    let now = Utc::now();
    attempt.status = if outcome.success {
        RetryStatus::Success
    } else {
        RetryStatus::Failed
    };
    attempt.completed_at = Some(now);
    attempt.result_success = Some(outcome.success);
    attempt.result_message = outcome.message.clone();
    attempt.result_response_code = outcome.response_code;

    let mut exception = snapshot.exception.clone();
    exception.status = t.to;
    exception.updated_at = now;

    let change = StatusChange::new(
        &exception.transaction_id,
        Some(t.from),
        t.to,
        SYSTEM_ACTOR,
        now,
    )
    .with_reason(outcome.message.clone(), None);

    guard
        .commit(UnitOfWork {
            exception: exception.clone(),
            attempt: Some(AttemptWrite::Update(attempt.clone())),
            status_change: Some(change),
            audit: None,
        })
        .await
        .map_err(|e| {
            error!(transaction_id = %outcome.transaction_id, error = %e, "Failed to commit retry outcome");
            MutationError::new(ErrorCode::DatabaseError, e.to_string())
        })?;

    Ok((exception, attempt))
}
