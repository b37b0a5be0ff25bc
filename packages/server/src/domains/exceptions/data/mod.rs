pub mod exception;
pub mod inputs;
pub mod results;

pub use exception::{AuditEntryData, ExceptionData, RetryAttemptData, StatusChangeData};
pub use inputs::{
    AcknowledgeExceptionInput, BulkAcknowledgeInput, BulkRetryInput, CancelRetryInput,
    ExceptionFilterInput, ResolveExceptionInput, RetryExceptionInput,
};
pub use results::{BulkResultData, MutationResultData};
