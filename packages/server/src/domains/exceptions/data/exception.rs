use chrono::{DateTime, Utc};
use juniper::{FieldResult, GraphQLObject};
use uuid::Uuid;

use crate::domains::exceptions::models::{
    AuditEntry, AuditResult, ExceptionCategory, ExceptionRecord, ExceptionStatus, InterfaceType,
    OperationType, ResolutionMethod, RetryAttempt, RetryPriority, RetryStatus, Severity,
    StatusChange,
};
use crate::server::graphql::context::GraphQLContext;

/// API representation of an exception
#[derive(Debug, Clone)]
pub struct ExceptionData {
    pub record: ExceptionRecord,
}

impl From<ExceptionRecord> for ExceptionData {
    fn from(record: ExceptionRecord) -> Self {
        Self { record }
    }
}

#[juniper::graphql_object(Context = GraphQLContext, name = "Exception")]
impl ExceptionData {
    fn id(&self) -> Uuid {
        self.record.id
    }
    fn transaction_id(&self) -> &str {
        &self.record.transaction_id
    }
    fn interface_type(&self) -> InterfaceType {
        self.record.interface_type
    }
    fn operation(&self) -> &str {
        &self.record.operation
    }
    fn exception_reason(&self) -> &str {
        &self.record.exception_reason
    }
    fn status(&self) -> ExceptionStatus {
        self.record.status
    }
    fn severity(&self) -> Severity {
        self.record.severity
    }
    fn category(&self) -> ExceptionCategory {
        self.record.category
    }
    fn customer_id(&self) -> Option<&str> {
        self.record.customer_id.as_deref()
    }
    fn location_code(&self) -> Option<&str> {
        self.record.location_code.as_deref()
    }

    fn retryable(&self) -> bool {
        self.record.retryable
    }
    fn retry_count(&self) -> i32 {
        self.record.retry_count
    }
    fn max_retries(&self) -> i32 {
        self.record.max_retries
    }
    fn last_retry_at(&self) -> Option<DateTime<Utc>> {
        self.record.last_retry_at
    }

    fn acknowledged_by(&self) -> Option<&str> {
        self.record.acknowledged_by.as_deref()
    }
    fn acknowledged_at(&self) -> Option<DateTime<Utc>> {
        self.record.acknowledged_at
    }
    fn acknowledgement_notes(&self) -> Option<&str> {
        self.record.acknowledgement_notes.as_deref()
    }

    fn resolved_by(&self) -> Option<&str> {
        self.record.resolved_by.as_deref()
    }
    fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.record.resolved_at
    }
    fn resolution_method(&self) -> Option<ResolutionMethod> {
        self.record.resolution_method
    }
    fn resolution_notes(&self) -> Option<&str> {
        self.record.resolution_notes.as_deref()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.record.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.record.updated_at
    }

    /// Retry attempts, oldest first
    async fn retry_history(&self, ctx: &GraphQLContext) -> FieldResult<Vec<RetryAttemptData>> {
        let attempts = ctx
            .loaders
            .retry_attempts
            .try_load(self.record.transaction_id.clone())
            .await?;
        Ok(attempts.into_iter().map(RetryAttemptData::from).collect())
    }

    /// Status transitions, oldest first
    async fn status_history(&self, ctx: &GraphQLContext) -> FieldResult<Vec<StatusChangeData>> {
        let changes = ctx
            .loaders
            .status_history
            .try_load(self.record.transaction_id.clone())
            .await?;
        Ok(changes.into_iter().map(StatusChangeData::from).collect())
    }
}

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(name = "RetryAttempt")]
pub struct RetryAttemptData {
    pub id: Uuid,
    pub transaction_id: String,
    pub attempt_number: i32,
    pub status: RetryStatus,
    pub priority: RetryPriority,
    pub reason: String,
    pub notes: Option<String>,
    pub initiated_by: String,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result_success: Option<bool>,
    pub result_message: Option<String>,
    pub result_response_code: Option<i32>,
    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<RetryAttempt> for RetryAttemptData {
    fn from(a: RetryAttempt) -> Self {
        Self {
            id: a.id,
            transaction_id: a.transaction_id,
            attempt_number: a.attempt_number,
            status: a.status,
            priority: a.priority,
            reason: a.reason,
            notes: a.notes,
            initiated_by: a.initiated_by,
            initiated_at: a.initiated_at,
            completed_at: a.completed_at,
            result_success: a.result_success,
            result_message: a.result_message,
            result_response_code: a.result_response_code,
            cancelled_by: a.cancelled_by,
            cancelled_at: a.cancelled_at,
        }
    }
}

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(name = "StatusChange")]
pub struct StatusChangeData {
    pub id: Uuid,
    pub from_status: Option<ExceptionStatus>,
    pub to_status: ExceptionStatus,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl From<StatusChange> for StatusChangeData {
    fn from(c: StatusChange) -> Self {
        Self {
            id: c.id,
            from_status: c.from_status,
            to_status: c.to_status,
            changed_by: c.changed_by,
            changed_at: c.changed_at,
            reason: c.reason,
            notes: c.notes,
        }
    }
}

#[derive(Debug, Clone, GraphQLObject)]
#[graphql(name = "AuditEntry")]
pub struct AuditEntryData {
    pub id: Uuid,
    pub operation_id: String,
    pub operation_type: OperationType,
    pub transaction_id: String,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
    pub result_status: AuditResult,
    pub error_code: Option<String>,
    pub error_detail: Option<String>,
}

impl From<AuditEntry> for AuditEntryData {
    fn from(e: AuditEntry) -> Self {
        Self {
            id: e.id,
            operation_id: e.operation_id,
            operation_type: e.operation_type,
            transaction_id: e.transaction_id,
            performed_by: e.performed_by,
            performed_at: e.performed_at,
            result_status: e.result_status,
            error_code: e.error_code,
            error_detail: e.error_detail,
        }
    }
}
