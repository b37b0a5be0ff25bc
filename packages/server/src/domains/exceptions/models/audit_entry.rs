// juniper's GraphQLEnum derive trips this future-compat lint on the `AuditResult::Error` variant.
#![allow(ambiguous_associated_items)]

use chrono::{DateTime, Utc};
use juniper::GraphQLEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mutation kinds recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, GraphQLEnum)]
#[sqlx(type_name = "mutation_operation", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Retry,
    Acknowledge,
    Resolve,
    CancelRetry,
    BulkRetry,
    BulkAcknowledge,
}

impl OperationType {
    /// Prefix used in generated operation ids
    pub fn prefix(&self) -> &'static str {
        match self {
            OperationType::Retry => "RETRY",
            OperationType::Acknowledge => "ACK",
            OperationType::Resolve => "RESOLVE",
            OperationType::CancelRetry => "CANCEL",
            OperationType::BulkRetry => "BULK_RETRY",
            OperationType::BulkAcknowledge => "BULK_ACK",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Retry => "RETRY",
            OperationType::Acknowledge => "ACKNOWLEDGE",
            OperationType::Resolve => "RESOLVE",
            OperationType::CancelRetry => "CANCEL_RETRY",
            OperationType::BulkRetry => "BULK_RETRY",
            OperationType::BulkAcknowledge => "BULK_ACKNOWLEDGE",
        }
    }

    /// Operation id: `{PREFIX}-{transactionId}-{unixMillis}`
    pub fn operation_id(&self, transaction_id: &str, at: DateTime<Utc>) -> String {
        format!(
            "{}-{}-{}",
            self.prefix(),
            transaction_id,
            at.timestamp_millis()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, GraphQLEnum)]
#[sqlx(type_name = "audit_result", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditResult {
    Success,
    Error,
}

/// Mutation audit log entry - one per attempted operation, never updated
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
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

impl AuditEntry {
    pub fn success(
        operation_id: &str,
        operation_type: OperationType,
        transaction_id: &str,
        performed_by: &str,
        performed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            operation_id: operation_id.to_string(),
            operation_type,
            transaction_id: transaction_id.to_string(),
            performed_by: performed_by.to_string(),
            performed_at,
            result_status: AuditResult::Success,
            error_code: None,
            error_detail: None,
        }
    }

    pub fn error(
        operation_id: &str,
        operation_type: OperationType,
        transaction_id: &str,
        performed_by: &str,
        performed_at: DateTime<Utc>,
        error_code: &str,
        error_detail: &str,
    ) -> Self {
        Self {
            result_status: AuditResult::Error,
            error_code: Some(error_code.to_string()),
            error_detail: Some(error_detail.to_string()),
            ..Self::success(
                operation_id,
                operation_type,
                transaction_id,
                performed_by,
                performed_at,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_operation_id_format() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            OperationType::Acknowledge.operation_id("TXN-1", at),
            "ACK-TXN-1-1700000000123"
        );
        assert_eq!(
            OperationType::BulkRetry.operation_id("TXN-1", at),
            "BULK_RETRY-TXN-1-1700000000123"
        );
    }
}
