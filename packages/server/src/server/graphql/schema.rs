//! GraphQL schema definition.
//!
//! Resolvers are thin: they delegate to the exception domain's edges.
//! Live updates are served over SSE, not GraphQL subscriptions.

use super::context::GraphQLContext;
use juniper::{EmptySubscription, FieldError, FieldResult, RootNode};

use crate::domains::exceptions::data::{
    AcknowledgeExceptionInput, AuditEntryData, BulkAcknowledgeInput, BulkResultData,
    BulkRetryInput, CancelRetryInput, ExceptionData, ExceptionFilterInput, MutationResultData,
    ResolveExceptionInput, RetryExceptionInput,
};
use crate::domains::exceptions::edges::{mutation as exception_mutations, query as exception_queries};

// =============================================================================
// Helper functions
// =============================================================================

/// Convert anyhow::Error to juniper FieldError for thin resolvers
pub fn to_field_error(e: anyhow::Error) -> FieldError {
    FieldError::new(e.to_string(), juniper::Value::null())
}

pub struct Query;

#[juniper::graphql_object(context = GraphQLContext)]
impl Query {
    /// Get a single exception by its transaction id
    async fn exception(
        ctx: &GraphQLContext,
        transaction_id: String,
    ) -> FieldResult<Option<ExceptionData>> {
        exception_queries::query_exception(ctx, transaction_id).await
    }

    /// List exceptions, newest first
    async fn exceptions(
        ctx: &GraphQLContext,
        filter: Option<ExceptionFilterInput>,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> FieldResult<Vec<ExceptionData>> {
        exception_queries::query_exceptions(ctx, filter, limit, offset).await
    }

    /// Mutation audit trail for one transaction (OPERATIONS or ADMIN)
    async fn audit_log(
        ctx: &GraphQLContext,
        transaction_id: String,
    ) -> FieldResult<Vec<AuditEntryData>> {
        exception_queries::query_audit_log(ctx, transaction_id).await
    }
}

pub struct Mutation;

#[juniper::graphql_object(context = GraphQLContext)]
impl Mutation {
    async fn retry_exception(
        ctx: &GraphQLContext,
        input: RetryExceptionInput,
    ) -> FieldResult<MutationResultData> {
        exception_mutations::retry_exception(ctx, input).await
    }

    async fn acknowledge_exception(
        ctx: &GraphQLContext,
        input: AcknowledgeExceptionInput,
    ) -> FieldResult<MutationResultData> {
        exception_mutations::acknowledge_exception(ctx, input).await
    }

    async fn resolve_exception(
        ctx: &GraphQLContext,
        input: ResolveExceptionInput,
    ) -> FieldResult<MutationResultData> {
        exception_mutations::resolve_exception(ctx, input).await
    }

    async fn cancel_retry(
        ctx: &GraphQLContext,
        input: CancelRetryInput,
    ) -> FieldResult<MutationResultData> {
        exception_mutations::cancel_retry(ctx, input).await
    }

    async fn bulk_retry_exceptions(
        ctx: &GraphQLContext,
        input: BulkRetryInput,
    ) -> FieldResult<BulkResultData> {
        exception_mutations::bulk_retry_exceptions(ctx, input).await
    }

    async fn bulk_acknowledge_exceptions(
        ctx: &GraphQLContext,
        input: BulkAcknowledgeInput,
    ) -> FieldResult<BulkResultData> {
        exception_mutations::bulk_acknowledge_exceptions(ctx, input).await
    }
}

pub type Schema = RootNode<'static, Query, Mutation, EmptySubscription<GraphQLContext>>;

pub fn create_schema() -> Schema {
    Schema::new(Query, Mutation, EmptySubscription::new())
}
