use juniper::{GraphQLEnum, GraphQLObject};
use serde::{Deserialize, Serialize};

use crate::common::AuthError;

/// Caller-visible error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, GraphQLEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Validation,
    BusinessRule,
    Authorization,
    System,
}

/// Closed set of mutation error codes; each has a fixed category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, GraphQLEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation
    MissingRequiredField,
    InvalidFieldValue,
    InvalidTransactionId,
    InvalidReasonLength,
    InvalidNotesLength,
    BulkSizeExceeded,

    // Authorization
    InsufficientPermissions,

    // Business rule
    ExceptionNotFound,
    NotRetryable,
    AlreadyResolved,
    AlreadyClosed,
    PendingRetryExists,
    RetryLimitExceeded,
    InvalidStatusTransition,
    NoPendingRetry,
    RetryAlreadyCompleted,
    InvalidResolutionMethodForStatus,

    // System
    RateLimitExceeded,
    OperationTimeout,
    DatabaseError,
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        use ErrorCode::*;
        match self {
            MissingRequiredField | InvalidFieldValue | InvalidTransactionId
            | InvalidReasonLength | InvalidNotesLength | BulkSizeExceeded => {
                ErrorCategory::Validation
            }
            InsufficientPermissions => ErrorCategory::Authorization,
            ExceptionNotFound | NotRetryable | AlreadyResolved | AlreadyClosed
            | PendingRetryExists | RetryLimitExceeded | InvalidStatusTransition
            | NoPendingRetry | RetryAlreadyCompleted | InvalidResolutionMethodForStatus => {
                ErrorCategory::BusinessRule
            }
            RateLimitExceeded | OperationTimeout | DatabaseError => ErrorCategory::System,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            MissingRequiredField => "MISSING_REQUIRED_FIELD",
            InvalidFieldValue => "INVALID_FIELD_VALUE",
            InvalidTransactionId => "INVALID_TRANSACTION_ID",
            InvalidReasonLength => "INVALID_REASON_LENGTH",
            InvalidNotesLength => "INVALID_NOTES_LENGTH",
            BulkSizeExceeded => "BULK_SIZE_EXCEEDED",
            InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ExceptionNotFound => "EXCEPTION_NOT_FOUND",
            NotRetryable => "NOT_RETRYABLE",
            AlreadyResolved => "ALREADY_RESOLVED",
            AlreadyClosed => "ALREADY_CLOSED",
            PendingRetryExists => "PENDING_RETRY_EXISTS",
            RetryLimitExceeded => "RETRY_LIMIT_EXCEEDED",
            InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
            NoPendingRetry => "NO_PENDING_RETRY",
            RetryAlreadyCompleted => "RETRY_ALREADY_COMPLETED",
            InvalidResolutionMethodForStatus => "INVALID_RESOLUTION_METHOD_FOR_STATUS",
            RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            OperationTimeout => "OPERATION_TIMEOUT",
            DatabaseError => "DATABASE_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error returned in a mutation response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, GraphQLObject)]
pub struct MutationError {
    pub code: ErrorCode,
    pub message: String,
    pub category: ErrorCategory,
}

impl MutationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            category: code.category(),
        }
    }
}

impl From<AuthError> for MutationError {
    fn from(err: AuthError) -> Self {
        MutationError::new(ErrorCode::InsufficientPermissions, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_fixed_per_code() {
        assert_eq!(ErrorCode::InvalidReasonLength.category(), ErrorCategory::Validation);
        assert_eq!(ErrorCode::AlreadyResolved.category(), ErrorCategory::BusinessRule);
        assert_eq!(ErrorCode::OperationTimeout.category(), ErrorCategory::System);
        assert_eq!(
            ErrorCode::InsufficientPermissions.category(),
            ErrorCategory::Authorization
        );
    }

    #[test]
    fn test_auth_error_maps_to_authorization() {
        let err = MutationError::from(AuthError::AdminRequired);
        assert_eq!(err.code, ErrorCode::InsufficientPermissions);
        assert_eq!(err.category, ErrorCategory::Authorization);
    }
}
