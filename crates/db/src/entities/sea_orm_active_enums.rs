//! `SeaORM` active enums stored as short strings, with conversions to the
//! domain types in `tuition-core`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tuition_core::fee::FeeStatus as CoreFeeStatus;
use tuition_core::posting::{
    BankCategory as CoreBankCategory, CashTransactionType as CoreCashType,
    DebitCredit as CoreDebitCredit, DirectorTransactionType as CoreDirectorType,
    PaymentMode as CorePaymentMode, PaymentStatus as CorePaymentStatus,
};
use tuition_core::switch::policy::SwitchPolicy as CoreSwitchPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[allow(missing_docs)]
pub enum FeeStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
    #[sea_orm(string_value = "TRANSFERRED")]
    Transferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[allow(missing_docs)]
pub enum PaymentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[allow(missing_docs)]
pub enum PaymentMode {
    #[sea_orm(string_value = "CASH")]
    Cash,
    #[sea_orm(string_value = "DIRECTOR")]
    Director,
    #[sea_orm(string_value = "UPI")]
    Upi,
    #[sea_orm(string_value = "CARD")]
    Card,
    #[sea_orm(string_value = "BANK_TRANSFER")]
    BankTransfer,
    #[sea_orm(string_value = "RAZORPAY")]
    Razorpay,
    #[sea_orm(string_value = "CHEQUE")]
    Cheque,
    #[sea_orm(string_value = "OTHER")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[allow(missing_docs)]
pub enum DebitCredit {
    #[sea_orm(string_value = "DEBIT")]
    Debit,
    #[sea_orm(string_value = "CREDIT")]
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[allow(missing_docs)]
pub enum CashTransactionType {
    #[sea_orm(string_value = "STUDENT_PAID")]
    StudentPaid,
    #[sea_orm(string_value = "OFFICE_EXPENSE")]
    OfficeExpense,
    #[sea_orm(string_value = "OWNER_TAKEN")]
    OwnerTaken,
    #[sea_orm(string_value = "OTHER_INCOME")]
    OtherIncome,
    #[sea_orm(string_value = "OTHER_EXPENSE")]
    OtherExpense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[allow(missing_docs)]
pub enum DirectorTransactionType {
    #[sea_orm(string_value = "STUDENT_PAID")]
    StudentPaid,
    #[sea_orm(string_value = "OWNER_TAKEN")]
    OwnerTaken,
    #[sea_orm(string_value = "OTHER_INCOME")]
    OtherIncome,
    #[sea_orm(string_value = "OTHER_EXPENSE")]
    OtherExpense,
    #[sea_orm(string_value = "INSTITUTION_GAVE_BANK")]
    InstitutionGaveBank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[allow(missing_docs)]
pub enum BankCategory {
    #[sea_orm(string_value = "STUDENT_PAYMENT")]
    StudentPayment,
    #[sea_orm(string_value = "DIRECTOR_DISBURSEMENT")]
    DirectorDisbursement,
    #[sea_orm(string_value = "OTHER_INCOME")]
    OtherIncome,
    #[sea_orm(string_value = "OTHER_EXPENSE")]
    OtherExpense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[allow(missing_docs)]
pub enum SwitchPolicy {
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
    #[sea_orm(string_value = "NEW_FEE")]
    NewFee,
    #[sea_orm(string_value = "SPLIT")]
    Split,
}

/// Generates both directions of a one-to-one enum mapping.
macro_rules! mirror {
    ($db:ident <=> $core:ident { $($variant:ident),+ $(,)? }) => {
        impl From<$core> for $db {
            fn from(value: $core) -> Self {
                match value {
                    $($core::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$db> for $core {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$variant,)+
                }
            }
        }
    };
}

mirror!(FeeStatus <=> CoreFeeStatus { Pending, Paid, Cancelled, Inactive, Transferred });
mirror!(PaymentStatus <=> CorePaymentStatus { Pending, Paid });
mirror!(PaymentMode <=> CorePaymentMode {
    Cash,
    Director,
    Upi,
    Card,
    BankTransfer,
    Razorpay,
    Cheque,
    Other,
});
mirror!(DebitCredit <=> CoreDebitCredit { Debit, Credit });
mirror!(CashTransactionType <=> CoreCashType {
    StudentPaid,
    OfficeExpense,
    OwnerTaken,
    OtherIncome,
    OtherExpense,
});
mirror!(DirectorTransactionType <=> CoreDirectorType {
    StudentPaid,
    OwnerTaken,
    OtherIncome,
    OtherExpense,
    InstitutionGaveBank,
});
mirror!(BankCategory <=> CoreBankCategory {
    StudentPayment,
    DirectorDisbursement,
    OtherIncome,
    OtherExpense,
});
mirror!(SwitchPolicy <=> CoreSwitchPolicy { Transfer, NewFee, Split });
