use chrono::{DateTime, Utc};
use juniper::GraphQLEnum;
use serde::{Deserialize, Serialize};

use crate::domains::exceptions::models::{ExceptionRecord, OperationType, RetryAttempt};

/// Exception-level event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, GraphQLEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionEventType {
    Created,
    Updated,
    Acknowledged,
    RetryInitiated,
    RetryCompleted,
    Resolved,
    Cancelled,
}

/// Retry-status event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, GraphQLEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetryEventType {
    Initiated,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

/// Discriminant used for subscription filtering and on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Exception(ExceptionEventType),
    Retry(RetryEventType),
    MutationCompleted,
}

impl EventKind {
    /// Every kind, in wire-name order
    pub const ALL: [EventKind; 13] = [
        EventKind::Exception(ExceptionEventType::Created),
        EventKind::Exception(ExceptionEventType::Updated),
        EventKind::Exception(ExceptionEventType::Acknowledged),
        EventKind::Exception(ExceptionEventType::RetryInitiated),
        EventKind::Exception(ExceptionEventType::RetryCompleted),
        EventKind::Exception(ExceptionEventType::Resolved),
        EventKind::Exception(ExceptionEventType::Cancelled),
        EventKind::Retry(RetryEventType::Initiated),
        EventKind::Retry(RetryEventType::InProgress),
        EventKind::Retry(RetryEventType::Completed),
        EventKind::Retry(RetryEventType::Failed),
        EventKind::Retry(RetryEventType::Cancelled),
        EventKind::MutationCompleted,
    ];

    /// Wire name. Retry-status kinds carry a `RETRY_STATUS_` prefix so they
    /// never collide with exception-level names.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Exception(t) => match t {
                ExceptionEventType::Created => "CREATED",
                ExceptionEventType::Updated => "UPDATED",
                ExceptionEventType::Acknowledged => "ACKNOWLEDGED",
                ExceptionEventType::RetryInitiated => "RETRY_INITIATED",
                ExceptionEventType::RetryCompleted => "RETRY_COMPLETED",
                ExceptionEventType::Resolved => "RESOLVED",
                ExceptionEventType::Cancelled => "CANCELLED",
            },
            EventKind::Retry(t) => match t {
                RetryEventType::Initiated => "RETRY_STATUS_INITIATED",
                RetryEventType::InProgress => "RETRY_STATUS_IN_PROGRESS",
                RetryEventType::Completed => "RETRY_STATUS_COMPLETED",
                RetryEventType::Failed => "RETRY_STATUS_FAILED",
                RetryEventType::Cancelled => "RETRY_STATUS_CANCELLED",
            },
            EventKind::MutationCompleted => "MUTATION_COMPLETED",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome details carried by MUTATION_COMPLETED events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub mutation_type: OperationType,
    pub success: bool,
    pub performed_by: String,
    pub operation_id: String,
    pub message: Option<String>,
}

/// Lifecycle event - ephemeral, consumed by the subscription hub
///
/// Published after a mutation commits (or fails, for MUTATION_COMPLETED)
/// and after upstream ingestion. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub kind: EventKind,
    pub transaction_id: String,
    /// Post-change snapshot; absent for failed mutations on missing rows
    pub exception: Option<ExceptionRecord>,
    pub retry_attempt: Option<RetryAttempt>,
    pub mutation: Option<MutationOutcome>,
    pub triggered_by: String,
    pub timestamp: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn exception(
        kind: ExceptionEventType,
        exception: &ExceptionRecord,
        triggered_by: &str,
    ) -> Self {
        Self {
            kind: EventKind::Exception(kind),
            transaction_id: exception.transaction_id.clone(),
            exception: Some(exception.clone()),
            retry_attempt: None,
            mutation: None,
            triggered_by: triggered_by.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn retry(
        kind: RetryEventType,
        exception: &ExceptionRecord,
        attempt: &RetryAttempt,
        triggered_by: &str,
    ) -> Self {
        Self {
            kind: EventKind::Retry(kind),
            transaction_id: exception.transaction_id.clone(),
            exception: Some(exception.clone()),
            retry_attempt: Some(attempt.clone()),
            mutation: None,
            triggered_by: triggered_by.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn mutation_completed(
        transaction_id: &str,
        exception: Option<&ExceptionRecord>,
        outcome: MutationOutcome,
    ) -> Self {
        Self {
            kind: EventKind::MutationCompleted,
            transaction_id: transaction_id.to_string(),
            exception: exception.cloned(),
            retry_attempt: None,
            triggered_by: outcome.performed_by.clone(),
            mutation: Some(outcome),
            timestamp: Utc::now(),
        }
    }

    /// Wire shape: `{eventKind, transactionId, payload, timestamp}`
    pub fn to_wire(&self) -> serde_json::Value {
        serde_json::json!({
            "eventKind": self.kind.as_str(),
            "transactionId": self.transaction_id,
            "payload": {
                "exception": self.exception,
                "retryAttempt": self.retry_attempt,
                "mutation": self.mutation,
                "triggeredBy": self.triggered_by,
            },
            "timestamp": self.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_names_are_unique_and_parse_back() {
        let mut names: Vec<&str> = EventKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), EventKind::ALL.len());

        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(
            EventKind::parse("retry_status_cancelled"),
            Some(EventKind::Retry(RetryEventType::Cancelled))
        );
        assert_eq!(EventKind::parse("DELETED"), None);
    }

    #[test]
    fn test_mutation_completed_wire_shape() {
        let event = LifecycleEvent::mutation_completed(
            "TXN-9",
            None,
            MutationOutcome {
                mutation_type: OperationType::Retry,
                success: false,
                performed_by: "ops-1".to_string(),
                operation_id: "RETRY-TXN-9-1".to_string(),
                message: Some("not found".to_string()),
            },
        );
        let wire = event.to_wire();
        assert_eq!(wire["eventKind"], "MUTATION_COMPLETED");
        assert_eq!(wire["transactionId"], "TXN-9");
        assert_eq!(wire["payload"]["mutation"]["mutationType"], "RETRY");
        assert_eq!(wire["payload"]["triggeredBy"], "ops-1");
        assert!(wire["payload"]["exception"].is_null());
    }
}
