//! Posting taxonomy shared by the three money entry points.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of a journal or bank row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebitCredit {
    /// Money out.
    Debit,
    /// Money in.
    Credit,
}

impl DebitCredit {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }

    /// Signed effect of `amount` on a running balance.
    #[must_use]
    pub const fn signed(self, amount: i64) -> i64 {
        match self {
            Self::Credit => amount,
            Self::Debit => -amount,
        }
    }
}

impl fmt::Display for DebitCredit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction types of the location cash journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashTransactionType {
    /// Fee money received from a student.
    StudentPaid,
    /// Day-to-day office spending.
    OfficeExpense,
    /// Cash handed to a director.
    OwnerTaken,
    /// Any other money in.
    OtherIncome,
    /// Any other money out.
    OtherExpense,
}

impl CashTransactionType {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StudentPaid => "STUDENT_PAID",
            Self::OfficeExpense => "OFFICE_EXPENSE",
            Self::OwnerTaken => "OWNER_TAKEN",
            Self::OtherIncome => "OTHER_INCOME",
            Self::OtherExpense => "OTHER_EXPENSE",
        }
    }

    /// Drawer direction of this type.
    #[must_use]
    pub const fn debit_credit(&self) -> DebitCredit {
        match self {
            Self::StudentPaid | Self::OtherIncome => DebitCredit::Credit,
            Self::OfficeExpense | Self::OwnerTaken | Self::OtherExpense => DebitCredit::Debit,
        }
    }

    /// Only student payments may link a student fee.
    #[must_use]
    pub const fn accepts_student(&self) -> bool {
        matches!(self, Self::StudentPaid)
    }

    /// Only owner withdrawals may name a director.
    #[must_use]
    pub const fn accepts_director(&self) -> bool {
        matches!(self, Self::OwnerTaken)
    }
}

impl fmt::Display for CashTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction types of a director's personal ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectorTransactionType {
    /// Fee money a student handed to the director.
    StudentPaid,
    /// Cash the director took from a location drawer.
    OwnerTaken,
    /// Any other money in.
    OtherIncome,
    /// Money the director spent.
    OtherExpense,
    /// The institute paid the director from a bank account.
    InstitutionGaveBank,
}

impl DirectorTransactionType {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StudentPaid => "STUDENT_PAID",
            Self::OwnerTaken => "OWNER_TAKEN",
            Self::OtherIncome => "OTHER_INCOME",
            Self::OtherExpense => "OTHER_EXPENSE",
            Self::InstitutionGaveBank => "INSTITUTION_GAVE_BANK",
        }
    }

    /// Direction from the director's point of view: only expenses are debits.
    #[must_use]
    pub const fn debit_credit(&self) -> DebitCredit {
        match self {
            Self::OtherExpense => DebitCredit::Debit,
            Self::StudentPaid | Self::OwnerTaken | Self::OtherIncome | Self::InstitutionGaveBank => {
                DebitCredit::Credit
            }
        }
    }

    /// Only student payments may link a student fee.
    #[must_use]
    pub const fn accepts_student(&self) -> bool {
        matches!(self, Self::StudentPaid)
    }

    /// Bank disbursements must name the paying account.
    #[must_use]
    pub const fn requires_bank_account(&self) -> bool {
        matches!(self, Self::InstitutionGaveBank)
    }
}

impl fmt::Display for DirectorTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a payment row is a scheduled due or settled money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Scheduled installment, no balance effect.
    Pending,
    /// Money received.
    Paid,
}

/// How the money arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMode {
    /// Cash at a location drawer.
    Cash,
    /// Handed to a director.
    Director,
    /// UPI transfer.
    Upi,
    /// Card payment.
    Card,
    /// Bank transfer.
    BankTransfer,
    /// Razorpay checkout.
    Razorpay,
    /// Cheque.
    Cheque,
    /// Anything else.
    Other,
}

/// Purpose of a bank transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankCategory {
    /// Fee money paid into the account.
    StudentPayment,
    /// Money paid out to a director.
    DirectorDisbursement,
    /// Any other money in.
    OtherIncome,
    /// Any other money out.
    OtherExpense,
}

impl BankCategory {
    /// Direction of the account movement.
    #[must_use]
    pub const fn direction(&self) -> DebitCredit {
        match self {
            Self::StudentPayment | Self::OtherIncome => DebitCredit::Credit,
            Self::DirectorDisbursement | Self::OtherExpense => DebitCredit::Debit,
        }
    }

    /// Categories that may be entered by hand rather than through a payment or ledger row.
    #[must_use]
    pub const fn is_manual(&self) -> bool {
        matches!(self, Self::OtherIncome | Self::OtherExpense)
    }
}
