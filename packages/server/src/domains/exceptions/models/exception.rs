use chrono::{DateTime, Utc};
use juniper::GraphQLEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of an exception.
///
/// RESOLVED and CLOSED are terminal; no operator mutation leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, GraphQLEnum)]
#[sqlx(type_name = "exception_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionStatus {
    New,
    Acknowledged,
    Retrying,
    RetriedSuccess,
    RetriedFailed,
    Failed,
    Escalated,
    Resolved,
    Closed,
}

impl ExceptionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExceptionStatus::Resolved | ExceptionStatus::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExceptionStatus::New => "NEW",
            ExceptionStatus::Acknowledged => "ACKNOWLEDGED",
            ExceptionStatus::Retrying => "RETRYING",
            ExceptionStatus::RetriedSuccess => "RETRIED_SUCCESS",
            ExceptionStatus::RetriedFailed => "RETRIED_FAILED",
            ExceptionStatus::Failed => "FAILED",
            ExceptionStatus::Escalated => "ESCALATED",
            ExceptionStatus::Resolved => "RESOLVED",
            ExceptionStatus::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for ExceptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, GraphQLEnum)]
#[sqlx(type_name = "exception_severity", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, GraphQLEnum)]
#[sqlx(type_name = "exception_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionCategory {
    Validation,
    BusinessRule,
    SystemError,
    NetworkError,
    Timeout,
    Authentication,
    Authorization,
    ExternalService,
}

/// Upstream interface that raised the exception
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, GraphQLEnum)]
#[sqlx(type_name = "interface_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterfaceType {
    Order,
    Collection,
    Distribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, GraphQLEnum)]
#[sqlx(type_name = "resolution_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionMethod {
    RetrySuccess,
    ManualResolution,
    CustomerResolved,
    Automated,
}

impl ResolutionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionMethod::RetrySuccess => "RETRY_SUCCESS",
            ResolutionMethod::ManualResolution => "MANUAL_RESOLUTION",
            ResolutionMethod::CustomerResolved => "CUSTOMER_RESOLVED",
            ResolutionMethod::Automated => "AUTOMATED",
        }
    }
}

/// Exception model - one row per tracked upstream failure
///
/// `transaction_id` is the immutable business key. Rows are never deleted;
/// every change goes through a validated status transition.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionRecord {
    pub id: Uuid,
    pub transaction_id: String,
    pub interface_type: InterfaceType,
    pub operation: String,
    pub exception_reason: String,
    pub status: ExceptionStatus,
    pub severity: Severity,
    pub category: ExceptionCategory,
    pub customer_id: Option<String>,
    pub location_code: Option<String>,

    // Retry metadata
    pub retryable: bool,
    pub retry_count: i32,
    pub max_retries: i32,
    pub last_retry_at: Option<DateTime<Utc>>,

    // Acknowledgement
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledgement_notes: Option<String>,

    // Resolution
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_method: Option<ResolutionMethod>,
    pub resolution_notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for listing exceptions
#[derive(Debug, Clone, Default)]
pub struct ExceptionFilter {
    pub status: Option<ExceptionStatus>,
    pub severity: Option<Severity>,
    pub interface_type: Option<InterfaceType>,
    pub customer_id: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl ExceptionFilter {
    pub fn matches(&self, exception: &ExceptionRecord) -> bool {
        self.status.map_or(true, |s| exception.status == s)
            && self.severity.map_or(true, |s| exception.severity == s)
            && self
                .interface_type
                .map_or(true, |t| exception.interface_type == t)
            && self
                .customer_id
                .as_deref()
                .map_or(true, |c| exception.customer_id.as_deref() == Some(c))
    }
}
