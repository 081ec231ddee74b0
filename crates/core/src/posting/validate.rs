//! Request validation for journal postings, run before any transaction opens.

use uuid::Uuid;

use crate::error::LedgerError;
use crate::posting::types::{CashTransactionType, DirectorTransactionType};

/// Rejects non-positive amounts.
pub fn validate_amount(amount: i64) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// Checks a cash journal row against its transaction type.
pub fn validate_cash_entry(
    transaction_type: CashTransactionType,
    amount: i64,
    student_id: Option<Uuid>,
    director_id: Option<Uuid>,
) -> Result<(), LedgerError> {
    validate_amount(amount)?;
    if student_id.is_some() && !transaction_type.accepts_student() {
        return Err(LedgerError::Validation(format!(
            "{transaction_type} entries cannot link a student"
        )));
    }
    if director_id.is_some() && !transaction_type.accepts_director() {
        return Err(LedgerError::Validation(format!(
            "{transaction_type} entries cannot name a director"
        )));
    }
    Ok(())
}

/// Checks a director ledger row against its transaction type.
pub fn validate_director_entry(
    transaction_type: DirectorTransactionType,
    amount: i64,
    student_id: Option<Uuid>,
    bank_account_id: Option<Uuid>,
) -> Result<(), LedgerError> {
    validate_amount(amount)?;
    if student_id.is_some() && !transaction_type.accepts_student() {
        return Err(LedgerError::Validation(format!(
            "{transaction_type} entries cannot link a student"
        )));
    }
    match (transaction_type.requires_bank_account(), bank_account_id) {
        (true, None) => Err(LedgerError::Validation(format!(
            "{transaction_type} entries need a bank account"
        ))),
        (false, Some(_)) => Err(LedgerError::Validation(format!(
            "{transaction_type} entries cannot name a bank account"
        ))),
        _ => Ok(()),
    }
}
