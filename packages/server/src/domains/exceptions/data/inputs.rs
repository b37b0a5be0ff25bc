use juniper::GraphQLInputObject;

use crate::domains::exceptions::actions::{
    AcknowledgeRequest, BulkAcknowledgeRequest, BulkRetryRequest, CancelRetryRequest,
    ResolveRequest, RetryRequest,
};
use crate::domains::exceptions::models::{
    ExceptionFilter, ExceptionStatus, InterfaceType, ResolutionMethod, RetryPriority, Severity,
};

#[derive(Debug, Clone, GraphQLInputObject)]
pub struct RetryExceptionInput {
    pub transaction_id: String,
    pub reason: String,
    /// Defaults to NORMAL
    pub priority: Option<RetryPriority>,
    pub notes: Option<String>,
}

impl From<RetryExceptionInput> for RetryRequest {
    fn from(input: RetryExceptionInput) -> Self {
        Self {
            transaction_id: input.transaction_id,
            reason: input.reason,
            priority: input.priority.unwrap_or(RetryPriority::Normal),
            notes: input.notes,
        }
    }
}

#[derive(Debug, Clone, GraphQLInputObject)]
pub struct AcknowledgeExceptionInput {
    pub transaction_id: String,
    pub reason: String,
    pub notes: Option<String>,
}

impl From<AcknowledgeExceptionInput> for AcknowledgeRequest {
    fn from(input: AcknowledgeExceptionInput) -> Self {
        Self {
            transaction_id: input.transaction_id,
            reason: input.reason,
            notes: input.notes,
        }
    }
}

#[derive(Debug, Clone, GraphQLInputObject)]
pub struct ResolveExceptionInput {
    pub transaction_id: String,
    pub resolution_method: ResolutionMethod,
    pub resolution_notes: Option<String>,
}

impl From<ResolveExceptionInput> for ResolveRequest {
    fn from(input: ResolveExceptionInput) -> Self {
        Self {
            transaction_id: input.transaction_id,
            resolution_method: input.resolution_method,
            resolution_notes: input.resolution_notes,
        }
    }
}

#[derive(Debug, Clone, GraphQLInputObject)]
pub struct CancelRetryInput {
    pub transaction_id: String,
    pub reason: String,
}

impl From<CancelRetryInput> for CancelRetryRequest {
    fn from(input: CancelRetryInput) -> Self {
        Self {
            transaction_id: input.transaction_id,
            reason: input.reason,
        }
    }
}

#[derive(Debug, Clone, GraphQLInputObject)]
pub struct BulkRetryInput {
    pub transaction_ids: Vec<String>,
    pub reason: String,
    pub priority: Option<RetryPriority>,
    pub notes: Option<String>,
}

impl From<BulkRetryInput> for BulkRetryRequest {
    fn from(input: BulkRetryInput) -> Self {
        Self {
            transaction_ids: input.transaction_ids,
            reason: input.reason,
            priority: input.priority.unwrap_or(RetryPriority::Normal),
            notes: input.notes,
        }
    }
}

#[derive(Debug, Clone, GraphQLInputObject)]
pub struct BulkAcknowledgeInput {
    pub transaction_ids: Vec<String>,
    pub reason: String,
    pub notes: Option<String>,
}

impl From<BulkAcknowledgeInput> for BulkAcknowledgeRequest {
    fn from(input: BulkAcknowledgeInput) -> Self {
        Self {
            transaction_ids: input.transaction_ids,
            reason: input.reason,
            notes: input.notes,
        }
    }
}

#[derive(Debug, Clone, Default, GraphQLInputObject)]
pub struct ExceptionFilterInput {
    pub status: Option<ExceptionStatus>,
    pub severity: Option<Severity>,
    pub interface_type: Option<InterfaceType>,
    pub customer_id: Option<String>,
}

impl ExceptionFilterInput {
    pub fn into_filter(self, limit: Option<i32>, offset: Option<i32>) -> ExceptionFilter {
        ExceptionFilter {
            status: self.status,
            severity: self.severity,
            interface_type: self.interface_type,
            customer_id: self.customer_id,
            limit: limit.unwrap_or(0) as i64,
            offset: offset.unwrap_or(0) as i64,
        }
    }
}
