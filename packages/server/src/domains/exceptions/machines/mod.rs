//! Status transition rules.
//!
//! Pure decision logic: given the locked exception, its retry attempts and the
//! requested operation, either allow the transition (and name the target
//! status) or deny it with a structured reason. Nothing here mutates state.

use crate::domains::exceptions::errors::ErrorCode;
use crate::domains::exceptions::models::{
    ExceptionRecord, ExceptionStatus, ResolutionMethod, RetryAttempt, RetryStatus,
};

/// Operation requested against a single exception
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Retry,
    Acknowledge,
    Resolve(ResolutionMethod),
    CancelRetry,
    /// Outcome of a retry reported by the executing system
    CompleteRetry { success: bool },
}

/// An allowed transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ExceptionStatus,
    pub to: ExceptionStatus,
}

/// A denied transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub code: ErrorCode,
    pub message: String,
}

impl Denial {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Decide whether `operation` may run against `exception`.
///
/// `attempts` are the exception's retry attempts in any order.
pub fn check_transition(
    exception: &ExceptionRecord,
    attempts: &[RetryAttempt],
    operation: Operation,
) -> Result<Transition, Denial> {
    use ExceptionStatus::*;

    let from = exception.status;
    let tx = exception.transaction_id.as_str();

    match from {
        Resolved => {
            return Err(Denial::new(
                ErrorCode::AlreadyResolved,
                format!("Exception {} is already resolved", tx),
            ))
        }
        Closed => {
            return Err(Denial::new(
                ErrorCode::AlreadyClosed,
                format!("Exception {} is already closed", tx),
            ))
        }
        _ => {}
    }

    let to = match operation {
        Operation::Retry => {
            if !exception.retryable {
                return Err(Denial::new(
                    ErrorCode::NotRetryable,
                    format!("Exception is not retryable for transaction: {}", tx),
                ));
            }
            if attempts.iter().any(RetryAttempt::is_pending) {
                return Err(Denial::new(
                    ErrorCode::PendingRetryExists,
                    format!("A retry is already pending for transaction: {}", tx),
                ));
            }
            if !matches!(from, New | Failed | RetriedFailed) {
                return Err(Denial::new(
                    ErrorCode::InvalidStatusTransition,
                    format!("Exception cannot be retried due to status: {}", from),
                ));
            }
            if exception.retry_count >= exception.max_retries {
                return Err(Denial::new(
                    ErrorCode::RetryLimitExceeded,
                    format!(
                        "Maximum retry count ({}) exceeded for transaction: {}",
                        exception.max_retries, tx
                    ),
                ));
            }
            Retrying
        }

        // A pending retry keeps the exception in RETRYING; acknowledgement
        // only records who has seen it.
        Operation::Acknowledge => match from {
            Retrying => Retrying,
            _ => Acknowledged,
        },

        Operation::Resolve(method) => {
            let expected = match from {
                RetriedSuccess => ResolutionMethod::RetrySuccess,
                Escalated => ResolutionMethod::CustomerResolved,
                Acknowledged => ResolutionMethod::ManualResolution,
                _ => {
                    return Err(Denial::new(
                        ErrorCode::InvalidStatusTransition,
                        format!("Exception cannot be resolved from status: {}", from),
                    ))
                }
            };
            if method != expected {
                return Err(Denial::new(
                    ErrorCode::InvalidResolutionMethodForStatus,
                    format!(
                        "Resolution method {} is not valid for status {}; expected {}",
                        method.as_str(),
                        from,
                        expected.as_str()
                    ),
                ));
            }
            Resolved
        }

        Operation::CancelRetry => {
            let latest = latest_attempt(attempts).ok_or_else(|| {
                Denial::new(
                    ErrorCode::NoPendingRetry,
                    format!("No retry attempts found for transaction: {}", tx),
                )
            })?;
            match latest.status {
                RetryStatus::Pending => {}
                RetryStatus::Cancelled => {
                    return Err(Denial::new(
                        ErrorCode::RetryAlreadyCompleted,
                        "Retry has already been cancelled",
                    ))
                }
                RetryStatus::Success => {
                    return Err(Denial::new(
                        ErrorCode::RetryAlreadyCompleted,
                        "Retry has already completed successfully",
                    ))
                }
                RetryStatus::Failed => {
                    return Err(Denial::new(
                        ErrorCode::RetryAlreadyCompleted,
                        "Retry has already failed",
                    ))
                }
            }
            if from != Retrying {
                return Err(Denial::new(
                    ErrorCode::InvalidStatusTransition,
                    format!("Retry cannot be cancelled while exception is {}", from),
                ));
            }
            latest.prior_status
        }

        Operation::CompleteRetry { success } => {
            if !attempts.iter().any(RetryAttempt::is_pending) {
                return Err(Denial::new(
                    ErrorCode::NoPendingRetry,
                    format!("No pending retry to complete for transaction: {}", tx),
                ));
            }
            if from != Retrying {
                return Err(Denial::new(
                    ErrorCode::InvalidStatusTransition,
                    format!("Retry outcome cannot be applied while exception is {}", from),
                ));
            }
            if success {
                RetriedSuccess
            } else {
                RetriedFailed
            }
        }
    };

    Ok(Transition { from, to })
}

/// Highest-numbered attempt
pub fn latest_attempt(attempts: &[RetryAttempt]) -> Option<&RetryAttempt> {
    attempts.iter().max_by_key(|a| a.attempt_number)
}

/// Next attempt number (1-based)
pub fn next_attempt_number(attempts: &[RetryAttempt]) -> i32 {
    latest_attempt(attempts).map_or(1, |a| a.attempt_number + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::exceptions::models::{
        ExceptionCategory, InterfaceType, RetryPriority, Severity,
    };
    use chrono::Utc;
    use uuid::Uuid;

    fn exception(status: ExceptionStatus) -> ExceptionRecord {
        let now = Utc::now();
        ExceptionRecord {
            id: Uuid::new_v4(),
            transaction_id: "TXN-1".to_string(),
            interface_type: InterfaceType::Order,
            operation: "CREATE_ORDER".to_string(),
            exception_reason: "Order rejected".to_string(),
            status,
            severity: Severity::High,
            category: ExceptionCategory::BusinessRule,
            customer_id: Some("CUST-1".to_string()),
            location_code: None,
            retryable: true,
            retry_count: 0,
            max_retries: 3,
            last_retry_at: None,
            acknowledged_by: None,
            acknowledged_at: None,
            acknowledgement_notes: None,
            resolved_by: None,
            resolved_at: None,
            resolution_method: None,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn attempt(number: i32, status: RetryStatus, prior: ExceptionStatus) -> RetryAttempt {
        RetryAttempt {
            id: Uuid::new_v4(),
            transaction_id: "TXN-1".to_string(),
            attempt_number: number,
            status,
            priority: RetryPriority::Normal,
            reason: "retry".to_string(),
            notes: None,
            prior_status: prior,
            initiated_by: "ops".to_string(),
            initiated_at: Utc::now(),
            completed_at: None,
            result_success: None,
            result_message: None,
            result_response_code: None,
            cancelled_by: None,
            cancelled_at: None,
        }
    }

    fn denial_code(result: Result<Transition, Denial>) -> ErrorCode {
        result.expect_err("expected denial").code
    }

    #[test]
    fn test_retry_allowed_from_eligible_statuses() {
        for status in [
            ExceptionStatus::New,
            ExceptionStatus::Failed,
            ExceptionStatus::RetriedFailed,
        ] {
            let t = check_transition(&exception(status), &[], Operation::Retry).unwrap();
            assert_eq!(t.to, ExceptionStatus::Retrying);
        }
    }

    #[test]
    fn test_retry_denials() {
        let mut not_retryable = exception(ExceptionStatus::New);
        not_retryable.retryable = false;
        assert_eq!(
            denial_code(check_transition(&not_retryable, &[], Operation::Retry)),
            ErrorCode::NotRetryable
        );

        let pending = [attempt(1, RetryStatus::Pending, ExceptionStatus::New)];
        assert_eq!(
            denial_code(check_transition(
                &exception(ExceptionStatus::Retrying),
                &pending,
                Operation::Retry
            )),
            ErrorCode::PendingRetryExists
        );

        assert_eq!(
            denial_code(check_transition(
                &exception(ExceptionStatus::Acknowledged),
                &[],
                Operation::Retry
            )),
            ErrorCode::InvalidStatusTransition
        );

        let mut exhausted = exception(ExceptionStatus::RetriedFailed);
        exhausted.retry_count = 3;
        assert_eq!(
            denial_code(check_transition(&exhausted, &[], Operation::Retry)),
            ErrorCode::RetryLimitExceeded
        );

        assert_eq!(
            denial_code(check_transition(
                &exception(ExceptionStatus::Resolved),
                &[],
                Operation::Retry
            )),
            ErrorCode::AlreadyResolved
        );
    }

    #[test]
    fn test_acknowledge_any_non_terminal() {
        let t = check_transition(&exception(ExceptionStatus::Escalated), &[], Operation::Acknowledge)
            .unwrap();
        assert_eq!(t.to, ExceptionStatus::Acknowledged);

        let t = check_transition(
            &exception(ExceptionStatus::Acknowledged),
            &[],
            Operation::Acknowledge,
        )
        .unwrap();
        assert_eq!(t.to, ExceptionStatus::Acknowledged);

        assert_eq!(
            denial_code(check_transition(
                &exception(ExceptionStatus::Closed),
                &[],
                Operation::Acknowledge
            )),
            ErrorCode::AlreadyClosed
        );
    }

    #[test]
    fn test_acknowledge_while_retrying_keeps_status() {
        let pending = [attempt(1, RetryStatus::Pending, ExceptionStatus::New)];
        let t = check_transition(
            &exception(ExceptionStatus::Retrying),
            &pending,
            Operation::Acknowledge,
        )
        .unwrap();
        assert_eq!(t.to, ExceptionStatus::Retrying);
    }

    #[test]
    fn test_resolution_method_must_match_status() {
        let retried = exception(ExceptionStatus::RetriedSuccess);
        assert_eq!(
            denial_code(check_transition(
                &retried,
                &[],
                Operation::Resolve(ResolutionMethod::ManualResolution)
            )),
            ErrorCode::InvalidResolutionMethodForStatus
        );
        let t = check_transition(
            &retried,
            &[],
            Operation::Resolve(ResolutionMethod::RetrySuccess),
        )
        .unwrap();
        assert_eq!(t.to, ExceptionStatus::Resolved);

        assert!(check_transition(
            &exception(ExceptionStatus::Escalated),
            &[],
            Operation::Resolve(ResolutionMethod::CustomerResolved)
        )
        .is_ok());
        assert!(check_transition(
            &exception(ExceptionStatus::Acknowledged),
            &[],
            Operation::Resolve(ResolutionMethod::ManualResolution)
        )
        .is_ok());
        assert_eq!(
            denial_code(check_transition(
                &exception(ExceptionStatus::New),
                &[],
                Operation::Resolve(ResolutionMethod::ManualResolution)
            )),
            ErrorCode::InvalidStatusTransition
        );
    }

    #[test]
    fn test_cancel_restores_prior_status() {
        let attempts = [
            attempt(1, RetryStatus::Failed, ExceptionStatus::New),
            attempt(2, RetryStatus::Pending, ExceptionStatus::RetriedFailed),
        ];
        let t = check_transition(
            &exception(ExceptionStatus::Retrying),
            &attempts,
            Operation::CancelRetry,
        )
        .unwrap();
        assert_eq!(t.to, ExceptionStatus::RetriedFailed);
    }

    #[test]
    fn test_cancel_denials() {
        assert_eq!(
            denial_code(check_transition(
                &exception(ExceptionStatus::New),
                &[],
                Operation::CancelRetry
            )),
            ErrorCode::NoPendingRetry
        );

        let cancelled = [attempt(1, RetryStatus::Cancelled, ExceptionStatus::New)];
        let denial = check_transition(
            &exception(ExceptionStatus::New),
            &cancelled,
            Operation::CancelRetry,
        )
        .unwrap_err();
        assert_eq!(denial.code, ErrorCode::RetryAlreadyCompleted);
        assert!(denial.message.contains("already been cancelled"));

        let succeeded = [attempt(1, RetryStatus::Success, ExceptionStatus::New)];
        let denial = check_transition(
            &exception(ExceptionStatus::RetriedSuccess),
            &succeeded,
            Operation::CancelRetry,
        )
        .unwrap_err();
        assert!(denial.message.contains("completed successfully"));
    }

    #[test]
    fn test_complete_retry_requires_pending() {
        let pending = [attempt(1, RetryStatus::Pending, ExceptionStatus::New)];
        let t = check_transition(
            &exception(ExceptionStatus::Retrying),
            &pending,
            Operation::CompleteRetry { success: false },
        )
        .unwrap();
        assert_eq!(t.to, ExceptionStatus::RetriedFailed);

        assert_eq!(
            denial_code(check_transition(
                &exception(ExceptionStatus::Retrying),
                &[],
                Operation::CompleteRetry { success: true }
            )),
            ErrorCode::NoPendingRetry
        );
    }

    #[test]
    fn test_next_attempt_number() {
        assert_eq!(next_attempt_number(&[]), 1);
        let attempts = [
            attempt(2, RetryStatus::Failed, ExceptionStatus::New),
            attempt(1, RetryStatus::Failed, ExceptionStatus::New),
        ];
        assert_eq!(next_attempt_number(&attempts), 3);
    }
}
