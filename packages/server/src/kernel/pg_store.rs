//! Postgres-backed exception store.
//!
//! The row lock is `SELECT ... FOR UPDATE` inside a transaction; the guard
//! owns that transaction, commits it with the unit of work, and rolls it back
//! when dropped.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::traits::{
    AttemptWrite, BaseAuditLogWriter, BaseExceptionStore, BaseRowGuard, ExceptionSnapshot,
    StoreError, UnitOfWork,
};
use crate::domains::exceptions::models::{
    AuditEntry, ExceptionFilter, ExceptionRecord, RetryAttempt, StatusChange,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

struct PgRowGuard {
    tx: Transaction<'static, Postgres>,
    snapshot: ExceptionSnapshot,
}

#[async_trait]
impl BaseRowGuard for PgRowGuard {
    fn snapshot(&self) -> &ExceptionSnapshot {
        &self.snapshot
    }

    async fn commit(self: Box<Self>, work: UnitOfWork) -> Result<(), StoreError> {
        let PgRowGuard { mut tx, .. } = *self;

        update_exception(&work.exception, &mut tx).await?;
        match &work.attempt {
            Some(AttemptWrite::Insert(attempt)) => insert_attempt(attempt, &mut tx).await?,
            Some(AttemptWrite::Update(attempt)) => update_attempt(attempt, &mut tx).await?,
            None => {}
        }
        if let Some(change) = &work.status_change {
            insert_status_change(change, &mut tx).await?;
        }
        if let Some(entry) = &work.audit {
            insert_audit_entry(entry, &mut tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl BaseExceptionStore for PgStore {
    async fn lock(&self, transaction_id: &str) -> Result<Option<Box<dyn BaseRowGuard>>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let exception = sqlx::query_as::<_, ExceptionRecord>(
            "SELECT * FROM exceptions WHERE transaction_id = $1 FOR UPDATE",
        )
        .bind(transaction_id)
        .fetch_optional(&mut *tx)
        .await?;

        // No row: the transaction rolls back on drop
        let Some(exception) = exception else {
            return Ok(None);
        };

        let attempts = sqlx::query_as::<_, RetryAttempt>(
            "SELECT * FROM retry_attempts WHERE transaction_id = $1 ORDER BY attempt_number",
        )
        .bind(transaction_id)
        .fetch_all(&mut *tx)
        .await?;

        Ok(Some(Box::new(PgRowGuard {
            tx,
            snapshot: ExceptionSnapshot {
                exception,
                attempts,
            },
        })))
    }

    async fn insert(
        &self,
        exception: ExceptionRecord,
        status_change: StatusChange,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO exceptions (
                id, transaction_id, interface_type, operation, exception_reason, status,
                severity, category, customer_id, location_code, retryable, retry_count,
                max_retries, last_retry_at, acknowledged_by, acknowledged_at,
                acknowledgement_notes, resolved_by, resolved_at, resolution_method,
                resolution_notes, created_at, updated_at
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                       $16, $17, $18, $19, $20, $21, $22, $23)
             ON CONFLICT (transaction_id) DO NOTHING",
        )
        .bind(exception.id)
        .bind(&exception.transaction_id)
        .bind(exception.interface_type)
        .bind(&exception.operation)
        .bind(&exception.exception_reason)
        .bind(exception.status)
        .bind(exception.severity)
        .bind(exception.category)
        .bind(&exception.customer_id)
        .bind(&exception.location_code)
        .bind(exception.retryable)
        .bind(exception.retry_count)
        .bind(exception.max_retries)
        .bind(exception.last_retry_at)
        .bind(&exception.acknowledged_by)
        .bind(exception.acknowledged_at)
        .bind(&exception.acknowledgement_notes)
        .bind(&exception.resolved_by)
        .bind(exception.resolved_at)
        .bind(exception.resolution_method)
        .bind(&exception.resolution_notes)
        .bind(exception.created_at)
        .bind(exception.updated_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(exception.transaction_id));
        }

        insert_status_change(&status_change, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find(&self, transaction_id: &str) -> Result<Option<ExceptionRecord>, StoreError> {
        sqlx::query_as::<_, ExceptionRecord>("SELECT * FROM exceptions WHERE transaction_id = $1")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Into::into)
    }

    async fn list(&self, filter: &ExceptionFilter) -> Result<Vec<ExceptionRecord>, StoreError> {
        sqlx::query_as::<_, ExceptionRecord>(
            "SELECT * FROM exceptions
             WHERE ($1::exception_status IS NULL OR status = $1)
               AND ($2::exception_severity IS NULL OR severity = $2)
               AND ($3::interface_type IS NULL OR interface_type = $3)
               AND ($4::text IS NULL OR customer_id = $4)
             ORDER BY created_at DESC, transaction_id
             LIMIT $5 OFFSET $6",
        )
        .bind(filter.status)
        .bind(filter.severity)
        .bind(filter.interface_type)
        .bind(&filter.customer_id)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn attempts_for(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Vec<RetryAttempt>>, StoreError> {
        let attempts = sqlx::query_as::<_, RetryAttempt>(
            "SELECT * FROM retry_attempts
             WHERE transaction_id = ANY($1)
             ORDER BY transaction_id, attempt_number",
        )
        .bind(transaction_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut map: HashMap<String, Vec<RetryAttempt>> = HashMap::new();
        for attempt in attempts {
            map.entry(attempt.transaction_id.clone())
                .or_default()
                .push(attempt);
        }
        Ok(map)
    }

    async fn status_history_for(
        &self,
        transaction_ids: &[String],
    ) -> Result<HashMap<String, Vec<StatusChange>>, StoreError> {
        let changes = sqlx::query_as::<_, StatusChange>(
            "SELECT * FROM exception_status_changes
             WHERE transaction_id = ANY($1)
             ORDER BY transaction_id, changed_at, id",
        )
        .bind(transaction_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut map: HashMap<String, Vec<StatusChange>> = HashMap::new();
        for change in changes {
            map.entry(change.transaction_id.clone())
                .or_default()
                .push(change);
        }
        Ok(map)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl BaseAuditLogWriter for PgStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        insert_audit_entry(&entry, &mut conn).await
    }

    async fn entries_for(&self, transaction_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        sqlx::query_as::<_, AuditEntry>(
            "SELECT * FROM mutation_audit_log
             WHERE transaction_id = $1
             ORDER BY performed_at, id",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }
}

// =============================================================================
// Statements shared by the guard and the pool paths
// =============================================================================

async fn update_exception(exception: &ExceptionRecord, conn: &mut PgConnection) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE exceptions SET
            exception_reason = $2, status = $3, severity = $4, category = $5,
            customer_id = $6, location_code = $7, retryable = $8, retry_count = $9,
            max_retries = $10, last_retry_at = $11, acknowledged_by = $12,
            acknowledged_at = $13, acknowledgement_notes = $14, resolved_by = $15,
            resolved_at = $16, resolution_method = $17, resolution_notes = $18,
            updated_at = $19
         WHERE transaction_id = $1",
    )
    .bind(&exception.transaction_id)
    .bind(&exception.exception_reason)
    .bind(exception.status)
    .bind(exception.severity)
    .bind(exception.category)
    .bind(&exception.customer_id)
    .bind(&exception.location_code)
    .bind(exception.retryable)
    .bind(exception.retry_count)
    .bind(exception.max_retries)
    .bind(exception.last_retry_at)
    .bind(&exception.acknowledged_by)
    .bind(exception.acknowledged_at)
    .bind(&exception.acknowledgement_notes)
    .bind(&exception.resolved_by)
    .bind(exception.resolved_at)
    .bind(exception.resolution_method)
    .bind(&exception.resolution_notes)
    .bind(exception.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_attempt(attempt: &RetryAttempt, conn: &mut PgConnection) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO retry_attempts (
            id, transaction_id, attempt_number, status, priority, reason, notes,
            prior_status, initiated_by, initiated_at, completed_at, result_success,
            result_message, result_response_code, cancelled_by, cancelled_at
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
    )
    .bind(attempt.id)
    .bind(&attempt.transaction_id)
    .bind(attempt.attempt_number)
    .bind(attempt.status)
    .bind(attempt.priority)
    .bind(&attempt.reason)
    .bind(&attempt.notes)
    .bind(attempt.prior_status)
    .bind(&attempt.initiated_by)
    .bind(attempt.initiated_at)
    .bind(attempt.completed_at)
    .bind(attempt.result_success)
    .bind(&attempt.result_message)
    .bind(attempt.result_response_code)
    .bind(&attempt.cancelled_by)
    .bind(attempt.cancelled_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn update_attempt(attempt: &RetryAttempt, conn: &mut PgConnection) -> Result<(), StoreError> {
    let updated = sqlx::query(
        "UPDATE retry_attempts SET
            status = $2, completed_at = $3, result_success = $4, result_message = $5,
            result_response_code = $6, cancelled_by = $7, cancelled_at = $8
         WHERE id = $1",
    )
    .bind(attempt.id)
    .bind(attempt.status)
    .bind(attempt.completed_at)
    .bind(attempt.result_success)
    .bind(&attempt.result_message)
    .bind(attempt.result_response_code)
    .bind(&attempt.cancelled_by)
    .bind(attempt.cancelled_at)
    .execute(conn)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(anyhow::anyhow!("Retry attempt {} not found", attempt.id).into());
    }
    Ok(())
}

async fn insert_status_change(change: &StatusChange, conn: &mut PgConnection) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO exception_status_changes (
            id, transaction_id, from_status, to_status, changed_by, changed_at, reason, notes
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(change.id)
    .bind(&change.transaction_id)
    .bind(change.from_status)
    .bind(change.to_status)
    .bind(&change.changed_by)
    .bind(change.changed_at)
    .bind(&change.reason)
    .bind(&change.notes)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert_audit_entry(entry: &AuditEntry, conn: &mut PgConnection) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO mutation_audit_log (
            id, operation_id, operation_type, transaction_id, performed_by, performed_at,
            result_status, error_code, error_detail
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(entry.id)
    .bind(&entry.operation_id)
    .bind(entry.operation_type)
    .bind(&entry.transaction_id)
    .bind(&entry.performed_by)
    .bind(entry.performed_at)
    .bind(entry.result_status)
    .bind(&entry.error_code)
    .bind(&entry.error_detail)
    .execute(conn)
    .await?;
    Ok(())
}
