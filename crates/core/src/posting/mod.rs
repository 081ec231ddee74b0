//! Posting sources: the cash journal, director ledgers and the payment recorder.
//!
//! # Modules
//!
//! - `types` - Transaction types, directions, payment modes and bank categories
//! - `origin` - The single posting source behind each payment
//! - `bank` - Bank linkage transitions on edit
//! - `edit` - Adjust vs re-attribute decisions
//! - `validate` - Request checks run before any write

pub mod bank;
pub mod edit;
pub mod origin;
pub mod types;
pub mod validate;

pub use bank::{BankLink, BankStep, ExistingBankLink, balance_effect, ensure_covered, plan_bank_transition};
pub use edit::{EditPlan, PostingLink};
pub use origin::{OriginLinks, PaymentOrigin};
pub use types::{
    BankCategory, CashTransactionType, DebitCredit, DirectorTransactionType, PaymentMode,
    PaymentStatus,
};
pub use validate::{validate_amount, validate_cash_entry, validate_director_entry};
