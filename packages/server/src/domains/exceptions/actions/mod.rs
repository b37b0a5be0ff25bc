//! Exception actions - the mutation pipeline and read-side queries
//!
//! Operator mutations never return `Err`; every failure is reported in the
//! response and audited. Ingestion and retry completion come from upstream
//! systems and return `Result`.

mod acknowledge;
mod bulk;
mod cancel_retry;
mod complete_retry;
mod ingest;
mod pipeline;
mod queries;
mod resolve;
mod retry;
pub mod validation;

pub use acknowledge::{acknowledge_exception, AcknowledgeRequest};
pub use bulk::{
    bulk_acknowledge_exceptions, bulk_retry_exceptions, BulkAcknowledgeRequest, BulkResponse,
    BulkRetryRequest, BULK_TRANSACTION_ID,
};
pub use cancel_retry::{cancel_retry, CancelRetryRequest};
pub use complete_retry::{complete_retry, RetryOutcome, SYSTEM_ACTOR};
pub use ingest::{ingest_exception, IngestEvent, IngestOutcome};
pub use pipeline::MutationResponse;
pub use queries::{audit_log, find_exception, list_exceptions, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use resolve::{resolve_exception, ResolveRequest};
pub use retry::{retry_exception, RetryRequest};
