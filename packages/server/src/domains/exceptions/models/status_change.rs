use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ExceptionStatus;

/// Append-only status history entry, written with every accepted transition
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub id: Uuid,
    pub transaction_id: String,
    /// `None` for the entry written when the exception is first ingested
    pub from_status: Option<ExceptionStatus>,
    pub to_status: ExceptionStatus,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl StatusChange {
    pub fn new(
        transaction_id: &str,
        from_status: Option<ExceptionStatus>,
        to_status: ExceptionStatus,
        changed_by: &str,
        changed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            transaction_id: transaction_id.to_string(),
            from_status,
            to_status,
            changed_by: changed_by.to_string(),
            changed_at,
            reason: None,
            notes: None,
        }
    }

    pub fn with_reason(mut self, reason: Option<String>, notes: Option<String>) -> Self {
        self.reason = reason;
        self.notes = notes;
        self
    }
}
