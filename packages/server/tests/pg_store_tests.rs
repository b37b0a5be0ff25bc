//! Postgres store tests
//!
//! Same pipeline, real row locks. These share one database container, so
//! every test uses its own transaction ids.
//!
//! Run with: cargo test --test pg_store_tests -- --ignored

mod common;

use std::sync::Arc;

use crate::common::{create_exception, PgHarness};
use exception_core::domains::exceptions::actions::{
    acknowledge_exception, complete_retry, resolve_exception, retry_exception,
    AcknowledgeRequest, ResolveRequest, RetryOutcome, RetryRequest,
};
use exception_core::domains::exceptions::models::{
    AuditResult, ExceptionStatus, OperationType, ResolutionMethod, RetryPriority, RetryStatus,
};
use exception_core::domains::exceptions::ErrorCode;
use exception_core::kernel::BaseExceptionStore;
use test_context::test_context;
use uuid::Uuid;

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

fn retry_request(transaction_id: &str) -> RetryRequest {
    RetryRequest {
        transaction_id: transaction_id.to_string(),
        reason: "Downstream recovered".to_string(),
        priority: RetryPriority::High,
        notes: None,
    }
}

#[test_context(PgHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn lifecycle_persists_histories(ctx: &PgHarness) {
    let tx = unique("PG-LIFE");
    create_exception(&ctx.deps, &tx).await.unwrap();

    let retried = retry_exception(retry_request(&tx), &ctx.operator("ops-1"), &ctx.deps).await;
    assert!(retried.success, "{:?}", retried.errors);

    complete_retry(
        RetryOutcome {
            transaction_id: tx.clone(),
            success: true,
            message: Some("Accepted".to_string()),
            response_code: Some(201),
        },
        &ctx.deps,
    )
    .await
    .unwrap();

    let resolved = resolve_exception(
        ResolveRequest {
            transaction_id: tx.clone(),
            resolution_method: ResolutionMethod::RetrySuccess,
            resolution_notes: Some("Closed after retry".to_string()),
        },
        &ctx.admin("admin-1"),
        &ctx.deps,
    )
    .await;
    assert!(resolved.success, "{:?}", resolved.errors);

    let row = ctx.deps.store.find(&tx).await.unwrap().unwrap();
    assert_eq!(row.status, ExceptionStatus::Resolved);
    assert_eq!(row.retry_count, 1);
    assert_eq!(row.resolved_by.as_deref(), Some("admin-1"));

    let attempts = ctx
        .deps
        .store
        .attempts_for(std::slice::from_ref(&tx))
        .await
        .unwrap();
    let attempts = &attempts[&tx];
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].status, RetryStatus::Success);
    assert_eq!(attempts[0].result_response_code, Some(201));

    let history = ctx
        .deps
        .store
        .status_history_for(std::slice::from_ref(&tx))
        .await
        .unwrap();
    let statuses: Vec<ExceptionStatus> = history[&tx].iter().map(|c| c.to_status).collect();
    assert_eq!(
        statuses,
        vec![
            ExceptionStatus::New,
            ExceptionStatus::Retrying,
            ExceptionStatus::RetriedSuccess,
            ExceptionStatus::Resolved,
        ]
    );
}

#[test_context(PgHarness)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires Docker"]
async fn row_lock_serializes_concurrent_retries(ctx: &PgHarness) {
    let tx = unique("PG-RACE");
    create_exception(&ctx.deps, &tx).await.unwrap();

    let deps = Arc::new(ctx.deps.clone());
    let mut handles = Vec::new();
    for i in 0..8 {
        let deps = deps.clone();
        let tx = tx.clone();
        let actor = ctx.operator(&format!("ops-{}", i));
        handles.push(tokio::spawn(async move {
            retry_exception(retry_request(&tx), &actor, &deps).await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        let response = handle.await.unwrap();
        if response.success {
            winners += 1;
        } else {
            assert_eq!(response.error_codes(), vec![ErrorCode::PendingRetryExists]);
        }
    }
    assert_eq!(winners, 1);

    let row = ctx.deps.store.find(&tx).await.unwrap().unwrap();
    assert_eq!(row.retry_count, 1);
    let attempts = ctx
        .deps
        .store
        .attempts_for(std::slice::from_ref(&tx))
        .await
        .unwrap();
    assert_eq!(attempts[&tx].len(), 1);
}

#[test_context(PgHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn audit_entries_are_stored_for_successes_and_denials(ctx: &PgHarness) {
    let tx = unique("PG-AUDIT");
    create_exception(&ctx.deps, &tx).await.unwrap();

    let acknowledged = acknowledge_exception(
        AcknowledgeRequest {
            transaction_id: tx.clone(),
            reason: "Investigating".to_string(),
            notes: None,
        },
        &ctx.operator("ops-1"),
        &ctx.deps,
    )
    .await;
    assert!(acknowledged.success);

    // Acknowledged is not a retryable status
    let denied = retry_exception(retry_request(&tx), &ctx.operator("ops-2"), &ctx.deps).await;
    assert_eq!(
        denied.error_codes(),
        vec![ErrorCode::InvalidStatusTransition]
    );

    let entries = ctx.deps.audit.entries_for(&tx).await.unwrap();
    assert_eq!(entries.len(), 2);

    let ack = entries
        .iter()
        .find(|e| e.operation_type == OperationType::Acknowledge)
        .unwrap();
    assert_eq!(ack.result_status, AuditResult::Success);
    assert_eq!(ack.performed_by, "ops-1");

    let retry = entries
        .iter()
        .find(|e| e.operation_type == OperationType::Retry)
        .unwrap();
    assert_eq!(retry.result_status, AuditResult::Error);
    assert_eq!(retry.error_code.as_deref(), Some("INVALID_STATUS_TRANSITION"));
}

#[test_context(PgHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn health_ping_reaches_database(ctx: &PgHarness) {
    ctx.deps.store.ping().await.unwrap();
    assert!(sqlx::query("SELECT 1").execute(&ctx.db_pool).await.is_ok());
}
