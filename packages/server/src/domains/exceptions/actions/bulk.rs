//! Bulk retry and bulk acknowledge.
//!
//! Request-level checks (size caps, shared fields, authorization, rate
//! limit) run once before any item. Items then run through the single-item
//! pipeline independently, so one item's failure never affects another.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::acknowledge::{run_acknowledge, AcknowledgeRequest};
use super::pipeline::{publish, Mutation, MutationResponse};
use super::retry::{run_retry, RetryRequest};
use super::validation::{check_notes, check_reason, MAX_NOTES_LENGTH};
use crate::common::{Actor, Capability};
use crate::domains::exceptions::errors::{ErrorCode, MutationError};
use crate::domains::exceptions::events::{LifecycleEvent, MutationOutcome};
use crate::domains::exceptions::models::{AuditResult, OperationType, RetryPriority};
use crate::kernel::ServerDeps;

/// Transaction id recorded for bulk calls rejected before any item ran
pub const BULK_TRANSACTION_ID: &str = "BULK_OPERATION";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRetryRequest {
    pub transaction_ids: Vec<String>,
    pub reason: String,
    pub priority: RetryPriority,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAcknowledgeRequest {
    pub transaction_ids: Vec<String>,
    pub reason: String,
    pub notes: Option<String>,
}

/// Aggregate result of a bulk call. `results` keeps request order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResponse {
    /// True when every item succeeded
    pub success: bool,
    pub operation_id: String,
    pub timestamp: DateTime<Utc>,
    pub performed_by: String,
    pub total_requested: i32,
    pub success_count: i32,
    pub failure_count: i32,
    pub results: Vec<MutationResponse>,
    /// Request-level errors; empty when items were processed
    pub errors: Vec<MutationError>,
}

pub async fn bulk_retry_exceptions(
    request: BulkRetryRequest,
    actor: &Actor,
    deps: &ServerDeps,
) -> BulkResponse {
    let gate = BulkGate::new(deps, actor, OperationType::BulkRetry, Capability::RetryExceptions);

    let mut errors = gate.size_errors(&request.transaction_ids);
    check_reason(&request.reason, &mut errors);
    check_notes(request.notes.as_deref(), MAX_NOTES_LENGTH, "notes", &mut errors);
    if let Err(rejected) = gate.admit(errors, request.transaction_ids.len()).await {
        return rejected;
    }

    let results = stream::iter(request.transaction_ids.iter().cloned())
        .map(|transaction_id| {
            let item = RetryRequest {
                transaction_id,
                reason: request.reason.clone(),
                priority: request.priority,
                notes: request.notes.clone(),
            };
            async move {
                let mutation = Mutation::bulk_item(
                    deps,
                    actor,
                    OperationType::BulkRetry,
                    Capability::RetryExceptions,
                    &item.transaction_id,
                );
                run_retry(mutation, &item).await
            }
        })
        .buffered(deps.settings.bulk_concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    gate.finish(results)
}

pub async fn bulk_acknowledge_exceptions(
    request: BulkAcknowledgeRequest,
    actor: &Actor,
    deps: &ServerDeps,
) -> BulkResponse {
    let gate = BulkGate::new(
        deps,
        actor,
        OperationType::BulkAcknowledge,
        Capability::AcknowledgeExceptions,
    );

    let mut errors = gate.size_errors(&request.transaction_ids);
    check_reason(&request.reason, &mut errors);
    check_notes(request.notes.as_deref(), MAX_NOTES_LENGTH, "notes", &mut errors);
    if let Err(rejected) = gate.admit(errors, request.transaction_ids.len()).await {
        return rejected;
    }

    let results = stream::iter(request.transaction_ids.iter().cloned())
        .map(|transaction_id| {
            let item = AcknowledgeRequest {
                transaction_id,
                reason: request.reason.clone(),
                notes: request.notes.clone(),
            };
            async move {
                let mutation = Mutation::bulk_item(
                    deps,
                    actor,
                    OperationType::BulkAcknowledge,
                    Capability::AcknowledgeExceptions,
                    &item.transaction_id,
                );
                run_acknowledge(mutation, &item).await
            }
        })
        .buffered(deps.settings.bulk_concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    gate.finish(results)
}

// =============================================================================
// Request-level checks
// =============================================================================

struct BulkGate<'a> {
    deps: &'a ServerDeps,
    actor: &'a Actor,
    operation: OperationType,
    capability: Capability,
    operation_id: String,
    timestamp: DateTime<Utc>,
}

impl<'a> BulkGate<'a> {
    fn new(
        deps: &'a ServerDeps,
        actor: &'a Actor,
        operation: OperationType,
        capability: Capability,
    ) -> Self {
        let timestamp = Utc::now();
        Self {
            deps,
            actor,
            operation,
            capability,
            operation_id: operation.operation_id(BULK_TRANSACTION_ID, timestamp),
            timestamp,
        }
    }

    fn size_errors(&self, transaction_ids: &[String]) -> Vec<MutationError> {
        let settings = &self.deps.settings;
        let mut errors = Vec::new();

        if transaction_ids.is_empty() {
            errors.push(MutationError::new(
                ErrorCode::MissingRequiredField,
                "transactionIds must contain at least one id",
            ));
        } else if transaction_ids.len() > settings.bulk_hard_limit {
            errors.push(MutationError::new(
                ErrorCode::BulkSizeExceeded,
                format!(
                    "Bulk operations are limited to {} items, got {}",
                    settings.bulk_hard_limit,
                    transaction_ids.len()
                ),
            ));
        } else if !self.actor.is_admin() && transaction_ids.len() > settings.non_admin_bulk_limit {
            errors.push(MutationError::new(
                ErrorCode::BulkSizeExceeded,
                format!(
                    "Bulk operations without ADMIN are limited to {} items, got {}",
                    settings.non_admin_bulk_limit,
                    transaction_ids.len()
                ),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = transaction_ids.iter().find(|id| !seen.insert(id.as_str())) {
            errors.push(MutationError::new(
                ErrorCode::InvalidFieldValue,
                format!("Duplicate transaction id in bulk request: {}", duplicate),
            ));
        }

        errors
    }

    /// Shape, authorization and rate limit, in that order. A rejection is
    /// audited once under the bulk operation type.
    async fn admit(&self, errors: Vec<MutationError>, requested: usize) -> Result<(), BulkResponse> {
        if !errors.is_empty() {
            return Err(self.reject(errors, requested).await);
        }

        if let Err(e) = self.actor.can(self.capability).check() {
            warn!(
                operation_id = %self.operation_id,
                user = %self.actor.user_id(),
                error = %e,
                "Bulk mutation not authorized"
            );
            return Err(self.reject(vec![e.into()], requested).await);
        }

        if let Err(e) = self
            .deps
            .rate_limiter
            .check(self.actor.user_id(), self.operation.as_str())
        {
            let error = MutationError::new(ErrorCode::RateLimitExceeded, e.to_string());
            return Err(self.reject(vec![error], requested).await);
        }

        Ok(())
    }

    async fn reject(&self, errors: Vec<MutationError>, requested: usize) -> BulkResponse {
        let (code, message) = errors
            .first()
            .map(|e| (e.code.as_str(), e.message.clone()))
            .unwrap_or(("UNKNOWN", String::new()));

        self.deps
            .audit
            .record(
                &self.operation_id,
                self.operation,
                BULK_TRANSACTION_ID,
                self.actor.user_id(),
                AuditResult::Error,
                Some((code, &message)),
            )
            .await;

        publish(
            self.deps,
            LifecycleEvent::mutation_completed(
                BULK_TRANSACTION_ID,
                None,
                MutationOutcome {
                    mutation_type: self.operation,
                    success: false,
                    performed_by: self.actor.user_id().to_string(),
                    operation_id: self.operation_id.clone(),
                    message: Some(message),
                },
            ),
        );

        BulkResponse {
            success: false,
            operation_id: self.operation_id.clone(),
            timestamp: self.timestamp,
            performed_by: self.actor.user_id().to_string(),
            total_requested: requested as i32,
            success_count: 0,
            failure_count: 0,
            results: Vec::new(),
            errors,
        }
    }

    fn finish(&self, results: Vec<MutationResponse>) -> BulkResponse {
        let total_requested = results.len() as i32;
        let success_count = results.iter().filter(|r| r.success).count() as i32;
        let failure_count = total_requested - success_count;

        info!(
            operation_id = %self.operation_id,
            operation = %self.operation.as_str(),
            total_requested,
            success_count,
            failure_count,
            "Bulk mutation finished"
        );

        BulkResponse {
            success: failure_count == 0,
            operation_id: self.operation_id.clone(),
            timestamp: self.timestamp,
            performed_by: self.actor.user_id().to_string(),
            total_requested,
            success_count,
            failure_count,
            results,
            errors: Vec::new(),
        }
    }
}
