pub mod actions;
pub mod data;
pub mod edges;
pub mod errors;
pub mod events;
pub mod loader;
pub mod machines;
pub mod models;

// Re-export data types (GraphQL types)
pub use data::{
    AuditEntryData, BulkResultData, ExceptionData, MutationResultData, RetryAttemptData,
    StatusChangeData,
};

// Re-export errors and events
pub use errors::{ErrorCategory, ErrorCode, MutationError};
pub use events::{EventKind, ExceptionEventType, LifecycleEvent, RetryEventType};

// Re-export models (domain models)
pub use models::{
    AuditEntry, ExceptionRecord, ExceptionStatus, RetryAttempt, RetryStatus, StatusChange,
};
