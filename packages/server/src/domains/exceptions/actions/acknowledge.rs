//! Acknowledge an exception

use serde::Deserialize;

use super::pipeline::{Applied, Mutation, MutationResponse};
use super::validation::{check_notes, check_reason, check_transaction_id, MAX_NOTES_LENGTH};
use crate::common::{Actor, Capability};
use crate::domains::exceptions::errors::MutationError;
use crate::domains::exceptions::events::{ExceptionEventType, LifecycleEvent};
use crate::domains::exceptions::machines::{check_transition, Operation};
use crate::domains::exceptions::models::{OperationType, StatusChange};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    pub transaction_id: String,
    pub reason: String,
    pub notes: Option<String>,
}

pub(crate) fn acknowledge_shape_errors(
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

/// Record that an operator has seen the exception.
///
/// While a retry is pending the status stays RETRYING; the acknowledgement
/// fields are still set.
pub async fn acknowledge_exception(
    request: AcknowledgeRequest,
    actor: &Actor,
    deps: &ServerDeps,
) -> MutationResponse {
    let mutation = Mutation::new(
        deps,
        actor,
        OperationType::Acknowledge,
        Capability::AcknowledgeExceptions,
        &request.transaction_id,
    );
    run_acknowledge(mutation, &request).await
}

pub(crate) async fn run_acknowledge(
    mutation: Mutation<'_>,
    request: &AcknowledgeRequest,
) -> MutationResponse {
    let shape_errors = acknowledge_shape_errors(
        &request.transaction_id,
        &request.reason,
        request.notes.as_deref(),
    );
    let reason = request.reason.clone();
    let notes = request.notes.clone();

    mutation
        .run(shape_errors, move |snapshot, by, now| {
            let t = check_transition(
                &snapshot.exception,
                &snapshot.attempts,
                Operation::Acknowledge,
            )?;

            let mut exception = snapshot.exception.clone();
            exception.status = t.to;
            exception.acknowledged_by = Some(by.to_string());
            exception.acknowledged_at = Some(now);
            exception.acknowledgement_notes = notes.clone();
            exception.updated_at = now;

            let change = StatusChange::new(&exception.transaction_id, Some(t.from), t.to, by, now)
                .with_reason(Some(reason), notes);

            let events = vec![LifecycleEvent::exception(
                ExceptionEventType::Acknowledged,
                &exception,
                by,
            )];

            Ok(Applied {
                exception,
                attempt: None,
                status_change: Some(change),
                events,
            })
        })
        .await
}
