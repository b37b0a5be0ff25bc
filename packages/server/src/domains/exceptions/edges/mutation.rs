//! Mutation edges. Authentication is required here; everything after that
//! (authorization included) is reported inside the result, not as a
//! GraphQL error.

use juniper::FieldResult;
use tracing::info;

use crate::domains::exceptions::actions;
use crate::domains::exceptions::data::{
    AcknowledgeExceptionInput, BulkAcknowledgeInput, BulkResultData, BulkRetryInput,
    CancelRetryInput, MutationResultData, ResolveExceptionInput, RetryExceptionInput,
};
use crate::server::graphql::context::GraphQLContext;

pub async fn retry_exception(
    ctx: &GraphQLContext,
    input: RetryExceptionInput,
) -> FieldResult<MutationResultData> {
    let actor = ctx.actor()?;
    info!(transaction_id = %input.transaction_id, user = %actor.user_id(), "Retry requested");
    Ok(actions::retry_exception(input.into(), &actor, &ctx.deps)
        .await
        .into())
}

pub async fn acknowledge_exception(
    ctx: &GraphQLContext,
    input: AcknowledgeExceptionInput,
) -> FieldResult<MutationResultData> {
    let actor = ctx.actor()?;
    info!(transaction_id = %input.transaction_id, user = %actor.user_id(), "Acknowledge requested");
    Ok(actions::acknowledge_exception(input.into(), &actor, &ctx.deps)
        .await
        .into())
}

pub async fn resolve_exception(
    ctx: &GraphQLContext,
    input: ResolveExceptionInput,
) -> FieldResult<MutationResultData> {
    let actor = ctx.actor()?;
    info!(transaction_id = %input.transaction_id, user = %actor.user_id(), "Resolve requested");
    Ok(actions::resolve_exception(input.into(), &actor, &ctx.deps)
        .await
        .into())
}

pub async fn cancel_retry(
    ctx: &GraphQLContext,
    input: CancelRetryInput,
) -> FieldResult<MutationResultData> {
    let actor = ctx.actor()?;
    info!(transaction_id = %input.transaction_id, user = %actor.user_id(), "Retry cancellation requested");
    Ok(actions::cancel_retry(input.into(), &actor, &ctx.deps)
        .await
        .into())
}

pub async fn bulk_retry_exceptions(
    ctx: &GraphQLContext,
    input: BulkRetryInput,
) -> FieldResult<BulkResultData> {
    let actor = ctx.actor()?;
    info!(count = input.transaction_ids.len(), user = %actor.user_id(), "Bulk retry requested");
    Ok(actions::bulk_retry_exceptions(input.into(), &actor, &ctx.deps)
        .await
        .into())
}

pub async fn bulk_acknowledge_exceptions(
    ctx: &GraphQLContext,
    input: BulkAcknowledgeInput,
) -> FieldResult<BulkResultData> {
    let actor = ctx.actor()?;
    info!(count = input.transaction_ids.len(), user = %actor.user_id(), "Bulk acknowledge requested");
    Ok(actions::bulk_acknowledge_exceptions(input.into(), &actor, &ctx.deps)
        .await
        .into())
}
