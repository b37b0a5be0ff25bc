//! Input shape checks run before authorization.
//!
//! Each check appends to a list so a caller sees every malformed field at
//! once.

use lazy_static::lazy_static;
use regex::Regex;

use crate::domains::exceptions::errors::{ErrorCode, MutationError};

pub const MAX_REASON_LENGTH: usize = 500;
pub const MAX_NOTES_LENGTH: usize = 1000;
pub const MAX_RESOLUTION_NOTES_LENGTH: usize = 2000;

lazy_static! {
    static ref TRANSACTION_ID: Regex =
        Regex::new(r"^[A-Za-z0-9\-_]{1,50}$").expect("transaction id pattern is valid");
}

pub fn is_valid_transaction_id(transaction_id: &str) -> bool {
    TRANSACTION_ID.is_match(transaction_id)
}

pub fn check_transaction_id(transaction_id: &str, errors: &mut Vec<MutationError>) {
    if transaction_id.trim().is_empty() {
        errors.push(MutationError::new(
            ErrorCode::MissingRequiredField,
            "transactionId is required",
        ));
    } else if !is_valid_transaction_id(transaction_id) {
        errors.push(MutationError::new(
            ErrorCode::InvalidTransactionId,
            "transactionId must be 1-50 characters of letters, digits, '-' or '_'",
        ));
    }
}

pub fn check_reason(reason: &str, errors: &mut Vec<MutationError>) {
    if reason.trim().is_empty() {
        errors.push(MutationError::new(
            ErrorCode::MissingRequiredField,
            "reason is required",
        ));
    } else if reason.chars().count() > MAX_REASON_LENGTH {
        errors.push(MutationError::new(
            ErrorCode::InvalidReasonLength,
            format!("reason must not exceed {} characters", MAX_REASON_LENGTH),
        ));
    }
}

pub fn check_notes(notes: Option<&str>, max: usize, field: &str, errors: &mut Vec<MutationError>) {
    if let Some(notes) = notes {
        if notes.chars().count() > max {
            errors.push(MutationError::new(
                ErrorCode::InvalidNotesLength,
                format!("{} must not exceed {} characters", field, max),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_pattern() {
        assert!(is_valid_transaction_id("TXN-2024_001"));
        assert!(!is_valid_transaction_id("TXN 001"));
        assert!(!is_valid_transaction_id("TXN/001"));
        assert!(!is_valid_transaction_id(&"A".repeat(51)));
        assert!(is_valid_transaction_id(&"A".repeat(50)));
    }

    #[test]
    fn test_collects_every_error() {
        let mut errors = Vec::new();
        check_transaction_id("bad id!", &mut errors);
        check_reason("", &mut errors);
        check_notes(Some(&"n".repeat(1001)), MAX_NOTES_LENGTH, "notes", &mut errors);

        let codes: Vec<ErrorCode> = errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::InvalidTransactionId,
                ErrorCode::MissingRequiredField,
                ErrorCode::InvalidNotesLength
            ]
        );
    }

    #[test]
    fn test_reason_length_boundary() {
        let mut errors = Vec::new();
        check_reason(&"r".repeat(MAX_REASON_LENGTH), &mut errors);
        assert!(errors.is_empty());
        check_reason(&"r".repeat(MAX_REASON_LENGTH + 1), &mut errors);
        assert_eq!(errors[0].code, ErrorCode::InvalidReasonLength);
    }
}
