use juniper::FieldResult;

use crate::domains::exceptions::actions;
use crate::domains::exceptions::data::{AuditEntryData, ExceptionData, ExceptionFilterInput};
use crate::server::graphql::context::GraphQLContext;
use crate::server::graphql::schema::to_field_error;

/// Get a single exception by transaction id
pub async fn query_exception(
    ctx: &GraphQLContext,
    transaction_id: String,
) -> FieldResult<Option<ExceptionData>> {
    let actor = ctx.actor()?;
    let exception = actions::find_exception(&transaction_id, &actor, &ctx.deps)
        .await
        .map_err(to_field_error)?;
    Ok(exception.map(ExceptionData::from))
}

/// List exceptions, newest first
pub async fn query_exceptions(
    ctx: &GraphQLContext,
    filter: Option<ExceptionFilterInput>,
    limit: Option<i32>,
    offset: Option<i32>,
) -> FieldResult<Vec<ExceptionData>> {
    let actor = ctx.actor()?;
    let filter = filter.unwrap_or_default().into_filter(limit, offset);
    let exceptions = actions::list_exceptions(filter, &actor, &ctx.deps)
        .await
        .map_err(to_field_error)?;
    Ok(exceptions.into_iter().map(ExceptionData::from).collect())
}

/// Audit entries for one transaction, oldest first
pub async fn query_audit_log(
    ctx: &GraphQLContext,
    transaction_id: String,
) -> FieldResult<Vec<AuditEntryData>> {
    let actor = ctx.actor()?;
    let entries = actions::audit_log(&transaction_id, &actor, &ctx.deps)
        .await
        .map_err(to_field_error)?;
    Ok(entries.into_iter().map(AuditEntryData::from).collect())
}
