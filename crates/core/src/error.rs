//! Ledger error types.
//!
//! Every ledger-affecting operation returns `LedgerError` on failure. All of
//! them are raised before or inside the atomic transaction, so a caller that
//! receives one knows that nothing was committed.

use std::fmt;

use thiserror::Error;
use tuition_shared::AppError;
use uuid::Uuid;

use crate::fee::FeeStatus;

/// Entity kinds named by `NotFound` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A student.
    Student,
    /// A batch.
    Batch,
    /// A course.
    Course,
    /// A fee record.
    Fee,
    /// A payment or scheduled due.
    Payment,
    /// A cash journal entry.
    CashEntry,
    /// A director.
    Director,
    /// A director ledger entry.
    DirectorLedgerEntry,
    /// A bank account.
    BankAccount,
    /// A bank transaction.
    BankTransaction,
}

impl EntityKind {
    /// Returns the name used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Batch => "batch",
            Self::Course => "course",
            Self::Fee => "fee",
            Self::Payment => "payment",
            Self::CashEntry => "cash entry",
            Self::Director => "director",
            Self::DirectorLedgerEntry => "director ledger entry",
            Self::BankAccount => "bank account",
            Self::BankTransaction => "bank transaction",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced record does not exist.
    NotFound,
    /// The record is not in a state that allows the operation.
    InvalidState,
    /// A batch has no free seat.
    CapacityExceeded,
    /// A bank account cannot cover a disbursement.
    InsufficientFunds,
    /// Stored data contradicts a ledger invariant.
    ConsistencyViolation,
    /// The request itself is malformed.
    Validation,
    /// The transaction did not commit within its time bound.
    Timeout,
    /// The store failed.
    Storage,
}

/// Errors raised by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A referenced record does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// What kind of record was looked up.
        entity: EntityKind,
        /// The id that was looked up.
        id: Uuid,
    },

    /// The student has no fee they currently owe against.
    #[error("Student {student_id} has no active fee record")]
    NoFeeRecord {
        /// The student.
        student_id: Uuid,
    },

    /// A batch switch found no active fee at the source batch.
    #[error("Student {student_id} has no active fee at batch {batch_id}")]
    NoActiveFeeAtSource {
        /// The student.
        student_id: Uuid,
        /// The batch the student is leaving.
        batch_id: Uuid,
    },

    /// The destination batch of a switch does not exist.
    #[error("Target batch {0} not found")]
    TargetNotFound(Uuid),

    /// The student's recorded batch differs from the one the caller named.
    #[error("Student {student_id} is in batch {actual:?}, not {expected}")]
    BatchMismatch {
        /// The student.
        student_id: Uuid,
        /// Batch the caller expected.
        expected: Uuid,
        /// Batch on record.
        actual: Option<Uuid>,
    },

    /// Money may not post to a cancelled, inactive or transferred fee.
    #[error("Fee {fee_id} is {status} and cannot change")]
    TerminalFee {
        /// The fee.
        fee_id: Uuid,
        /// Its terminal status.
        status: FeeStatus,
    },

    /// The fee is already fully paid.
    #[error("Fee {0} is already fully paid")]
    FeeAlreadyPaid(Uuid),

    /// The fee was frozen by a split batch switch.
    #[error("Fee {0} was frozen by a batch split and cannot change")]
    FeeFrozen(Uuid),

    /// Any other state conflict.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The batch has no free seat.
    #[error("Batch {batch_id} is full ({slot_limit} seats)")]
    BatchFull {
        /// The batch.
        batch_id: Uuid,
        /// Its capacity.
        slot_limit: i32,
    },

    /// A disbursement exceeds the account balance.
    #[error("Bank account {account_id} balance {balance} cannot cover {requested}")]
    InsufficientBankBalance {
        /// The account.
        account_id: Uuid,
        /// Its balance before the disbursement.
        balance: i64,
        /// The amount requested.
        requested: i64,
    },

    /// The switch policy name is not one of the known policies.
    #[error("Unknown batch switch policy: {0}")]
    UnknownPolicy(String),

    /// The request is malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Stored data contradicts a ledger invariant.
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    /// The transaction did not commit in time and was rolled back.
    #[error("Transaction did not complete within {0} ms")]
    Timeout(u128),

    /// Database failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Shorthand for a `NotFound` error.
    #[must_use]
    pub const fn not_found(entity: EntityKind, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. }
            | Self::NoFeeRecord { .. }
            | Self::NoActiveFeeAtSource { .. }
            | Self::TargetNotFound(_) => ErrorKind::NotFound,
            Self::BatchMismatch { .. }
            | Self::TerminalFee { .. }
            | Self::FeeAlreadyPaid(_)
            | Self::FeeFrozen(_)
            | Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::BatchFull { .. } => ErrorKind::CapacityExceeded,
            Self::InsufficientBankBalance { .. } => ErrorKind::InsufficientFunds,
            Self::UnknownPolicy(_) | Self::Validation(_) => ErrorKind::Validation,
            Self::ConsistencyViolation(_) => ErrorKind::ConsistencyViolation,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Database(_) => ErrorKind::Storage,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidState | ErrorKind::InsufficientFunds => 422,
            ErrorKind::CapacityExceeded => 409,
            ErrorKind::Validation => 400,
            ErrorKind::Timeout => 503,
            ErrorKind::ConsistencyViolation | ErrorKind::Storage => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::NoFeeRecord { .. } => "NO_FEE_RECORD",
            Self::NoActiveFeeAtSource { .. } => "NO_ACTIVE_FEE_AT_SOURCE",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::BatchMismatch { .. } => "BATCH_MISMATCH",
            Self::TerminalFee { .. } => "TERMINAL_FEE",
            Self::FeeAlreadyPaid(_) => "FEE_ALREADY_PAID",
            Self::FeeFrozen(_) => "FEE_FROZEN",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::BatchFull { .. } => "BATCH_FULL",
            Self::InsufficientBankBalance { .. } => "INSUFFICIENT_BANK_BALANCE",
            Self::UnknownPolicy(_) => "UNKNOWN_POLICY",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ConsistencyViolation(_) => "CONSISTENCY_VIOLATION",
            Self::Timeout(_) => "TIMEOUT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::InvalidState => Self::InvalidState(message),
            ErrorKind::CapacityExceeded => Self::CapacityExceeded(message),
            ErrorKind::InsufficientFunds => Self::InsufficientFunds(message),
            ErrorKind::ConsistencyViolation => Self::ConsistencyViolation(message),
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Timeout => Self::Timeout(message),
            ErrorKind::Storage => Self::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LedgerError::not_found(EntityKind::Fee, Uuid::nil()), ErrorKind::NotFound, 404)]
    #[case(LedgerError::NoFeeRecord { student_id: Uuid::nil() }, ErrorKind::NotFound, 404)]
    #[case(LedgerError::FeeAlreadyPaid(Uuid::nil()), ErrorKind::InvalidState, 422)]
    #[case(
        LedgerError::BatchFull { batch_id: Uuid::nil(), slot_limit: 30 },
        ErrorKind::CapacityExceeded,
        409
    )]
    #[case(
        LedgerError::InsufficientBankBalance { account_id: Uuid::nil(), balance: 10, requested: 20 },
        ErrorKind::InsufficientFunds,
        422
    )]
    #[case(LedgerError::UnknownPolicy("MERGE".into()), ErrorKind::Validation, 400)]
    #[case(
        LedgerError::ConsistencyViolation("two origins".into()),
        ErrorKind::ConsistencyViolation,
        500
    )]
    #[case(LedgerError::Timeout(5000), ErrorKind::Timeout, 503)]
    fn test_kind_and_status(
        #[case] error: LedgerError,
        #[case] kind: ErrorKind,
        #[case] status: u16,
    ) {
        assert_eq!(error.kind(), kind);
        assert_eq!(error.status_code(), status);
    }

    #[test]
    fn test_not_found_names_entity() {
        let id = Uuid::nil();
        let err = LedgerError::not_found(EntityKind::BankAccount, id);
        assert_eq!(err.to_string(), format!("bank account {id} not found"));
    }

    #[test]
    fn test_into_app_error_keeps_category() {
        let app: AppError = LedgerError::BatchFull {
            batch_id: Uuid::nil(),
            slot_limit: 2,
        }
        .into();
        assert_eq!(app.error_code(), "CAPACITY_EXCEEDED");

        let app: AppError = LedgerError::TerminalFee {
            fee_id: Uuid::nil(),
            status: FeeStatus::Cancelled,
        }
        .into();
        assert_eq!(app.status_code(), 422);
    }
}
