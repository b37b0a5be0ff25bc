use chrono::{DateTime, Utc};
use juniper::GraphQLEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ExceptionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, GraphQLEnum)]
#[sqlx(type_name = "retry_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetryStatus {
    Pending,
    Success,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, GraphQLEnum)]
#[sqlx(type_name = "retry_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetryPriority {
    Low,
    Normal,
    High,
    Urgent,
}

/// One recorded try to re-execute the failed operation
///
/// `attempt_number` is 1-based and sequential per exception. At most one
/// attempt per exception is PENDING at any time.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryAttempt {
    pub id: Uuid,
    pub transaction_id: String,
    pub attempt_number: i32,
    pub status: RetryStatus,
    pub priority: RetryPriority,
    pub reason: String,
    pub notes: Option<String>,

    /// Exception status when this attempt was initiated; restored on cancel
    pub prior_status: ExceptionStatus,

    pub initiated_by: String,
    pub initiated_at: DateTime<Utc>,

    // Outcome (external completion event)
    pub completed_at: Option<DateTime<Utc>>,
    pub result_success: Option<bool>,
    pub result_message: Option<String>,
    pub result_response_code: Option<i32>,

    pub cancelled_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl RetryAttempt {
    pub fn is_pending(&self) -> bool {
        self.status == RetryStatus::Pending
    }
}
