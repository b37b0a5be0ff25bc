//! Resolve an exception

use serde::Deserialize;

use super::pipeline::{Applied, Mutation, MutationResponse};
use super::validation::{check_notes, check_transaction_id, MAX_RESOLUTION_NOTES_LENGTH};
use crate::common::{Actor, Capability};
use crate::domains::exceptions::events::{ExceptionEventType, LifecycleEvent};
use crate::domains::exceptions::machines::{check_transition, Operation};
use crate::domains::exceptions::models::{OperationType, ResolutionMethod, StatusChange};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub transaction_id: String,
    pub resolution_method: ResolutionMethod,
    pub resolution_notes: Option<String>,
}

/// Close out an exception. The method must agree with the current status
/// (RETRIED_SUCCESS, ESCALATED or ACKNOWLEDGED).
pub async fn resolve_exception(
    request: ResolveRequest,
    actor: &Actor,
    deps: &ServerDeps,
) -> MutationResponse {
    let mut shape_errors = Vec::new();
    check_transaction_id(&request.transaction_id, &mut shape_errors);
    check_notes(
        request.resolution_notes.as_deref(),
        MAX_RESOLUTION_NOTES_LENGTH,
        "resolutionNotes",
        &mut shape_errors,
    );

    let method = request.resolution_method;
    let notes = request.resolution_notes.clone();

    Mutation::new(
        deps,
        actor,
        OperationType::Resolve,
        Capability::ResolveExceptions,
        &request.transaction_id,
    )
    .run(shape_errors, move |snapshot, by, now| {
        let t = check_transition(
            &snapshot.exception,
            &snapshot.attempts,
            Operation::Resolve(method),
        )?;

        let mut exception = snapshot.exception.clone();
        exception.status = t.to;
        exception.resolved_by = Some(by.to_string());
        exception.resolved_at = Some(now);
        exception.resolution_method = Some(method);
        exception.resolution_notes = notes.clone();
        exception.updated_at = now;

        let change = StatusChange::new(&exception.transaction_id, Some(t.from), t.to, by, now)
            .with_reason(Some(format!("Resolved via {}", method.as_str())), notes);

        let events = vec![LifecycleEvent::exception(
            ExceptionEventType::Resolved,
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
