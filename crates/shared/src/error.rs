//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// The caller could not be identified.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The record is not in a state that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A batch has no free seat.
    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// A bank account cannot cover a disbursement.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Stored data contradicts a ledger invariant.
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    /// The transaction did not finish in time and was rolled back.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// External service error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::InvalidState(_) | Self::InsufficientFunds(_) => 422,
            Self::CapacityExceeded(_) => 409,
            Self::Timeout(_) => 503,
            Self::ConsistencyViolation(_)
            | Self::Database(_)
            | Self::ExternalService(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            Self::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            Self::ConsistencyViolation(_) => "CONSISTENCY_VIOLATION",
            Self::Timeout(_) => "TIMEOUT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Unauthorized(String::new()), 401, "UNAUTHORIZED")]
    #[case(AppError::NotFound(String::new()), 404, "NOT_FOUND")]
    #[case(AppError::Validation(String::new()), 400, "VALIDATION_ERROR")]
    #[case(AppError::InvalidState(String::new()), 422, "INVALID_STATE")]
    #[case(AppError::CapacityExceeded(String::new()), 409, "CAPACITY_EXCEEDED")]
    #[case(AppError::InsufficientFunds(String::new()), 422, "INSUFFICIENT_FUNDS")]
    #[case(
        AppError::ConsistencyViolation(String::new()),
        500,
        "CONSISTENCY_VIOLATION"
    )]
    #[case(AppError::Timeout(String::new()), 503, "TIMEOUT")]
    #[case(AppError::Database(String::new()), 500, "DATABASE_ERROR")]
    #[case(AppError::Internal(String::new()), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(#[case] error: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(error.status_code(), status);
        assert_eq!(error.error_code(), code);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::NotFound("fee 42".into()).to_string(),
            "Not found: fee 42"
        );
        assert_eq!(
            AppError::CapacityExceeded("batch full".into()).to_string(),
            "Capacity exceeded: batch full"
        );
    }
}
