//! Test fixtures for creating test data.
//!
//! Exceptions are created through the ingestion path, the same way the
//! upstream collector creates them. `force_status` bypasses the transition
//! rules to put a row into a state no operator call can reach directly.

use anyhow::{anyhow, Result};
use chrono::Utc;
use exception_core::domains::exceptions::actions::{ingest_exception, IngestEvent};
use exception_core::domains::exceptions::models::{
    ExceptionCategory, ExceptionRecord, ExceptionStatus, InterfaceType, Severity, StatusChange,
};
use exception_core::kernel::{BaseExceptionStore, BaseRowGuard, ServerDeps, UnitOfWork};

/// A retryable ORDER exception with three retries allowed
pub fn order_failure(transaction_id: &str) -> IngestEvent {
    IngestEvent::builder()
        .transaction_id(transaction_id)
        .interface_type(InterfaceType::Order)
        .operation("CREATE_ORDER")
        .exception_reason("Downstream order service rejected the payload")
        .severity(Severity::High)
        .category(ExceptionCategory::ExternalService)
        .customer_id(Some("CUST-001".to_string()))
        .build()
}

/// Create a NEW exception
pub async fn create_exception(deps: &ServerDeps, transaction_id: &str) -> Result<ExceptionRecord> {
    create_from(deps, order_failure(transaction_id)).await
}

/// Create an exception from a custom ingest event
pub async fn create_from(deps: &ServerDeps, event: IngestEvent) -> Result<ExceptionRecord> {
    let outcome = ingest_exception(event, deps)
        .await
        .map_err(|e| anyhow!("ingest failed: {} {}", e.code, e.message))?;
    Ok(outcome.exception)
}

/// Create an exception and move it straight to `status`
pub async fn create_with_status(
    deps: &ServerDeps,
    transaction_id: &str,
    status: ExceptionStatus,
) -> Result<ExceptionRecord> {
    create_exception(deps, transaction_id).await?;
    force_status(deps, transaction_id, status).await
}

/// Overwrite the status of an existing exception, recording a status change
pub async fn force_status(
    deps: &ServerDeps,
    transaction_id: &str,
    status: ExceptionStatus,
) -> Result<ExceptionRecord> {
    let guard = deps
        .store
        .lock(transaction_id)
        .await?
        .ok_or_else(|| anyhow!("no exception for {}", transaction_id))?;

    let now = Utc::now();
    let mut exception = guard.snapshot().exception.clone();
    let from = exception.status;
    exception.status = status;
    exception.updated_at = now;

    guard
        .commit(UnitOfWork {
            exception: exception.clone(),
            attempt: None,
            status_change: Some(StatusChange::new(
                transaction_id,
                Some(from),
                status,
                "fixture",
                now,
            )),
            audit: None,
        })
        .await?;

    Ok(exception)
}
