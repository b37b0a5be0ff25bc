//! Cancel a pending retry

use serde::Deserialize;

use super::pipeline::{Applied, Mutation, MutationResponse};
use super::validation::{check_reason, check_transaction_id};
use crate::common::{Actor, Capability};
use crate::domains::exceptions::errors::ErrorCode;
use crate::domains::exceptions::events::{ExceptionEventType, LifecycleEvent, RetryEventType};
use crate::domains::exceptions::machines::{check_transition, latest_attempt, Denial, Operation};
use crate::domains::exceptions::models::{OperationType, RetryStatus, StatusChange};
use crate::kernel::{AttemptWrite, ServerDeps};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRetryRequest {
    pub transaction_id: String,
    pub reason: String,
}

/// Cancel the latest attempt. The exception returns to the status it held
/// when that attempt started; `retry_count` is not rolled back.
pub async fn cancel_retry(
    request: CancelRetryRequest,
    actor: &Actor,
    deps: &ServerDeps,
) -> MutationResponse {
    let mut shape_errors = Vec::new();
    check_transaction_id(&request.transaction_id, &mut shape_errors);
    check_reason(&request.reason, &mut shape_errors);

    let reason = request.reason.clone();

    Mutation::new(
        deps,
        actor,
        OperationType::CancelRetry,
        Capability::CancelRetries,
        &request.transaction_id,
    )
    .run(shape_errors, move |snapshot, by, now| {
        let t = check_transition(
            &snapshot.exception,
            &snapshot.attempts,
            Operation::CancelRetry,
        )?;

        let mut attempt = latest_attempt(&snapshot.attempts)
            .cloned()
            .ok_or_else(|| Denial::new(ErrorCode::NoPendingRetry, "No retry attempt to cancel"))?;
        attempt.status = RetryStatus::Cancelled;
        attempt.cancelled_by = Some(by.to_string());
        attempt.cancelled_at = Some(now);
        attempt.result_message = Some(format!("Retry cancelled: {}", reason));

        let mut exception = snapshot.exception.clone();
        exception.status = t.to;
        exception.updated_at = now;

        let change = StatusChange::new(&exception.transaction_id, Some(t.from), t.to, by, now)
            .with_reason(Some(reason), None);

        let events = vec![
            LifecycleEvent::exception(ExceptionEventType::Cancelled, &exception, by),
            LifecycleEvent::retry(RetryEventType::Cancelled, &exception, &attempt, by),
        ];

        Ok(Applied {
            exception,
            attempt: Some(AttemptWrite::Update(attempt)),
            status_change: Some(change),
            events,
        })
    })
    .await
}
