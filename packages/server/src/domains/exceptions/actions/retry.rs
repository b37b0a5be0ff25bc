//! Retry an exception

use serde::Deserialize;
use uuid::Uuid;

use super::pipeline::{Applied, Mutation, MutationResponse};
use super::validation::{check_notes, check_reason, check_transaction_id, MAX_NOTES_LENGTH};
use crate::common::{Actor, Capability};
use crate::domains::exceptions::errors::MutationError;
use crate::domains::exceptions::events::{ExceptionEventType, LifecycleEvent, RetryEventType};
use crate::domains::exceptions::machines::{check_transition, next_attempt_number, Operation};
use crate::domains::exceptions::models::{
    OperationType, RetryAttempt, RetryPriority, RetryStatus, StatusChange,
};
use crate::kernel::{AttemptWrite, ServerDeps};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryRequest {
    pub transaction_id: String,
    pub reason: String,
    pub priority: RetryPriority,
    pub notes: Option<String>,
}

/// Shape errors for a retry request, in field order
pub(crate) fn retry_shape_errors(
    transaction_id: &str,
    reason: &str,
    notes: Option<&str>,
) -> Vec<MutationError> {
    let mut errors = Vec::new();
    check_transaction_id(transaction_id, &mut errors);
    check_reason(reason, &mut errors);
    check_notes(notes, MAX_NOTES_LENGTH, "notes", &mut errors);
    errors
}

/// Start a new retry attempt. The exception moves to RETRYING and the
/// attempt is recorded as PENDING until the executing system reports back.
pub async fn retry_exception(
    request: RetryRequest,
    actor: &Actor,
    deps: &ServerDeps,
) -> MutationResponse {
    let mutation = Mutation::new(
        deps,
        actor,
        OperationType::Retry,
        Capability::RetryExceptions,
        &request.transaction_id,
    );
    run_retry(mutation, &request).await
}

pub(crate) async fn run_retry(mutation: Mutation<'_>, request: &RetryRequest) -> MutationResponse {
    let shape_errors = retry_shape_errors(
        &request.transaction_id,
        &request.reason,
        request.notes.as_deref(),
    );
    let reason = request.reason.clone();
    let notes = request.notes.clone();
    let priority = request.priority;

    mutation
        .run(shape_errors, move |snapshot, by, now| {
            let t = check_transition(&snapshot.exception, &snapshot.attempts, Operation::Retry)?;

            let attempt = RetryAttempt {
                id: Uuid::now_v7(),
                transaction_id: snapshot.exception.transaction_id.clone(),
                attempt_number: next_attempt_number(&snapshot.attempts),
                status: RetryStatus::Pending,
                priority,
                reason: reason.clone(),
                notes: notes.clone(),
                prior_status: t.from,
                initiated_by: by.to_string(),
                initiated_at: now,
                completed_at: None,
                result_success: None,
                result_message: None,
                result_response_code: None,
                cancelled_by: None,
                cancelled_at: None,
            };

            let mut exception = snapshot.exception.clone();
            exception.status = t.to;
            exception.retry_count += 1;
            exception.last_retry_at = Some(now);
            exception.updated_at = now;

            let change = StatusChange::new(&exception.transaction_id, Some(t.from), t.to, by, now)
                .with_reason(Some(reason), notes);

            let events = vec![
                LifecycleEvent::exception(ExceptionEventType::RetryInitiated, &exception, by),
                LifecycleEvent::retry(RetryEventType::Initiated, &exception, &attempt, by),
            ];

            Ok(Applied {
                exception,
                attempt: Some(AttemptWrite::Insert(attempt)),
                status_change: Some(change),
                events,
            })
        })
        .await
}
