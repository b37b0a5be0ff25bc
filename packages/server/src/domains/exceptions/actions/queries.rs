//! Read-side queries. Authorization is checked here, storage is a plain read.

use anyhow::Result;

use crate::common::{Actor, Capability};
use crate::domains::exceptions::models::{AuditEntry, ExceptionFilter, ExceptionRecord};
use crate::kernel::ServerDeps;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

pub async fn find_exception(
    transaction_id: &str,
    actor: &Actor,
    deps: &ServerDeps,
) -> Result<Option<ExceptionRecord>> {
    actor.can(Capability::ViewExceptions).check()?;
    Ok(deps.store.find(transaction_id).await?)
}

/// List exceptions newest first. `limit` is clamped to `1..=MAX_PAGE_SIZE`.
pub async fn list_exceptions(
    mut filter: ExceptionFilter,
    actor: &Actor,
    deps: &ServerDeps,
) -> Result<Vec<ExceptionRecord>> {
    actor.can(Capability::ViewExceptions).check()?;

    filter.limit = match filter.limit {
        l if l <= 0 => DEFAULT_PAGE_SIZE,
        l => l.min(MAX_PAGE_SIZE),
    };
    filter.offset = filter.offset.max(0);

    Ok(deps.store.list(&filter).await?)
}

pub async fn audit_log(
    transaction_id: &str,
    actor: &Actor,
    deps: &ServerDeps,
) -> Result<Vec<AuditEntry>> {
    actor.can(Capability::ViewAuditLog).check()?;
    Ok(deps.audit.entries_for(transaction_id).await?)
}
