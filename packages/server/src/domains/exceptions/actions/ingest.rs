//! Upstream exception ingestion.
//!
//! Upsert keyed by transaction id: a new id creates a NEW exception with its
//! initial status history entry; a known id refreshes the descriptive fields
//! and leaves status and retry bookkeeping alone.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use super::complete_retry::SYSTEM_ACTOR;
use super::pipeline::publish;
use super::validation::check_transaction_id;
use crate::domains::exceptions::errors::{ErrorCode, MutationError};
use crate::domains::exceptions::events::{ExceptionEventType, LifecycleEvent};
use crate::domains::exceptions::models::{
    ExceptionCategory, ExceptionRecord, ExceptionStatus, InterfaceType, Severity, StatusChange,
};
use crate::kernel::{BaseRowGuard, ServerDeps, StoreError, UnitOfWork};

/// Failure reported by an upstream interface service
#[derive(Clone, Debug, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(setter(into)))]
pub struct IngestEvent {
    pub transaction_id: String,
    pub interface_type: InterfaceType,
    pub operation: String,
    pub exception_reason: String,
    pub severity: Severity,
    pub category: ExceptionCategory,
    #[serde(default)]
    #[builder(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub location_code: Option<String>,
    #[serde(default = "default_retryable")]
    #[builder(default = true)]
    pub retryable: bool,
    #[serde(default = "default_max_retries")]
    #[builder(default = 3)]
    pub max_retries: i32,
}

fn default_retryable() -> bool {
    true
}

fn default_max_retries() -> i32 {
    3
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub exception: ExceptionRecord,
    pub created: bool,
}

pub async fn ingest_exception(
    event: IngestEvent,
    deps: &ServerDeps,
) -> Result<IngestOutcome, MutationError> {
    let mut errors = Vec::new();
    check_transaction_id(&event.transaction_id, &mut errors);
    if event.operation.trim().is_empty() {
        errors.push(MutationError::new(
            ErrorCode::MissingRequiredField,
            "operation is required",
        ));
    }
    if event.exception_reason.trim().is_empty() {
        errors.push(MutationError::new(
            ErrorCode::MissingRequiredField,
            "exceptionReason is required",
        ));
    }
    if event.max_retries < 0 {
        errors.push(MutationError::new(
            ErrorCode::InvalidFieldValue,
            "maxRetries must not be negative",
        ));
    }
    if let Some(first) = errors.into_iter().next() {
        return Err(first);
    }

    let deadline = deps.settings.operation_timeout;
    let outcome = tokio::time::timeout(deadline, upsert(&event, deps))
        .await
        .map_err(|_| {
            MutationError::new(
                ErrorCode::OperationTimeout,
                format!("Operation timed out after {}ms", deadline.as_millis()),
            )
        })??;

    let kind = if outcome.created {
        ExceptionEventType::Created
    } else {
        ExceptionEventType::Updated
    };
    info!(
        transaction_id = %outcome.exception.transaction_id,
        created = outcome.created,
        "Exception ingested"
    );
    publish(
        deps,
        LifecycleEvent::exception(kind, &outcome.exception, SYSTEM_ACTOR),
    );

    Ok(outcome)
}

async fn upsert(event: &IngestEvent, deps: &ServerDeps) -> Result<IngestOutcome, MutationError> {
    if let Some(guard) = deps.store.lock(&event.transaction_id).await.map_err(store_error)? {
        return refresh(guard, event).await;
    }

    let now = Utc::now();
    let exception = ExceptionRecord {
        id: Uuid::now_v7(),
        transaction_id: event.transaction_id.clone(),
        interface_type: event.interface_type,
        operation: event.operation.clone(),
        exception_reason: event.exception_reason.clone(),
        status: ExceptionStatus::New,
        severity: event.severity,
        category: event.category,
        customer_id: event.customer_id.clone(),
        location_code: event.location_code.clone(),
        retryable: event.retryable,
        retry_count: 0,
        max_retries: event.max_retries,
        last_retry_at: None,
        acknowledged_by: None,
        acknowledged_at: None,
        acknowledgement_notes: None,
        resolved_by: None,
        resolved_at: None,
        resolution_method: None,
        resolution_notes: None,
        created_at: now,
        updated_at: now,
    };
    let change = StatusChange::new(
        &exception.transaction_id,
        None,
        ExceptionStatus::New,
        SYSTEM_ACTOR,
        now,
    )
    .with_reason(Some(event.exception_reason.clone()), None);

    match deps.store.insert(exception.clone(), change).await {
        Ok(()) => Ok(IngestOutcome {
            exception,
            created: true,
        }),
        // Lost the race with a concurrent ingest of the same id
        Err(StoreError::AlreadyExists(_)) => {
            match deps.store.lock(&event.transaction_id).await.map_err(store_error)? {
                Some(guard) => refresh(guard, event).await,
                None => Err(MutationError::new(
                    ErrorCode::DatabaseError,
                    format!("Exception {} vanished during ingest", event.transaction_id),
                )),
            }
        }
        Err(e) => Err(store_error(e)),
    }
}

async fn refresh(
    guard: Box<dyn BaseRowGuard>,
    event: &IngestEvent,
) -> Result<IngestOutcome, MutationError> {
    let mut exception = guard.snapshot().exception.clone();
    exception.operation = event.operation.clone();
    exception.exception_reason = event.exception_reason.clone();
    exception.severity = event.severity;
    exception.category = event.category;
    exception.customer_id = event.customer_id.clone();
    exception.location_code = event.location_code.clone();
    exception.retryable = event.retryable;
    exception.updated_at = Utc::now();

    guard
        .commit(UnitOfWork {
            exception: exception.clone(),
            attempt: None,
            status_change: None,
            audit: None,
        })
        .await
        .map_err(store_error)?;

    Ok(IngestOutcome {
        exception,
        created: false,
    })
}

fn store_error(e: StoreError) -> MutationError {
    error!(error = %e, "Exception store failure during ingest");
    MutationError::new(ErrorCode::DatabaseError, e.to_string())
}
