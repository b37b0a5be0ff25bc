use chrono::{DateTime, Utc};

use super::exception::{ExceptionData, RetryAttemptData};
use crate::domains::exceptions::actions::{BulkResponse, MutationResponse};
use crate::domains::exceptions::errors::MutationError;
use crate::server::graphql::context::GraphQLContext;

/// API representation of a single mutation's outcome
#[derive(Debug, Clone)]
pub struct MutationResultData {
    pub response: MutationResponse,
}

impl From<MutationResponse> for MutationResultData {
    fn from(response: MutationResponse) -> Self {
        Self { response }
    }
}

#[juniper::graphql_object(Context = GraphQLContext, name = "MutationResult")]
impl MutationResultData {
    fn success(&self) -> bool {
        self.response.success
    }
    fn transaction_id(&self) -> &str {
        &self.response.transaction_id
    }
    fn operation_id(&self) -> &str {
        &self.response.operation_id
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.response.timestamp
    }
    fn performed_by(&self) -> &str {
        &self.response.performed_by
    }
    fn exception(&self) -> Option<ExceptionData> {
        self.response.exception.clone().map(ExceptionData::from)
    }
    fn retry_attempt(&self) -> Option<RetryAttemptData> {
        self.response.attempt.clone().map(RetryAttemptData::from)
    }
    fn errors(&self) -> &[MutationError] {
        &self.response.errors
    }
}

/// API representation of a bulk mutation's outcome
#[derive(Debug, Clone)]
pub struct BulkResultData {
    pub response: BulkResponse,
}

impl From<BulkResponse> for BulkResultData {
    fn from(response: BulkResponse) -> Self {
        Self { response }
    }
}

#[juniper::graphql_object(Context = GraphQLContext, name = "BulkResult")]
impl BulkResultData {
    fn success(&self) -> bool {
        self.response.success
    }
    fn operation_id(&self) -> &str {
        &self.response.operation_id
    }
    fn timestamp(&self) -> DateTime<Utc> {
        self.response.timestamp
    }
    fn performed_by(&self) -> &str {
        &self.response.performed_by
    }
    fn total_requested(&self) -> i32 {
        self.response.total_requested
    }
    fn success_count(&self) -> i32 {
        self.response.success_count
    }
    fn failure_count(&self) -> i32 {
        self.response.failure_count
    }
    fn results(&self) -> Vec<MutationResultData> {
        self.response
            .results
            .iter()
            .cloned()
            .map(MutationResultData::from)
            .collect()
    }
    fn errors(&self) -> &[MutationError] {
        &self.response.errors
    }
}
