//! `SeaORM` Entity for payments table.
//!
//! One row per money movement (status PAID) or per scheduled due (status
//! PENDING). At most one of the three origin columns is set.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tuition_core::LedgerError;
use tuition_core::posting::{OriginLinks, PaymentOrigin};

use super::sea_orm_active_enums::{PaymentMode, PaymentStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub fee_id: Uuid,
    pub student_id: Uuid,
    pub amount: i64,
    pub status: PaymentStatus,
    pub mode: Option<PaymentMode>,
    pub due_date: Option<Date>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub transaction_ref: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub is_advance: bool,
    pub cash_entry_id: Option<Uuid>,
    pub director_ledger_entry_id: Option<Uuid>,
    pub bank_transaction_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::fees::Entity",
        from = "Column::FeeId",
        to = "super::fees::Column::Id"
    )]
    Fees,
    #[sea_orm(
        belongs_to = "super::students::Entity",
        from = "Column::StudentId",
        to = "super::students::Column::Id"
    )]
    Students,
}

impl Related<super::fees::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Fees.def()
    }
}

impl Related<super::students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The posting source behind this payment.
    ///
    /// # Errors
    ///
    /// Returns `ConsistencyViolation` if more than one origin column is set.
    pub fn origin(&self) -> Result<PaymentOrigin, LedgerError> {
        PaymentOrigin::from_links(
            self.id,
            OriginLinks {
                cash_entry_id: self.cash_entry_id,
                director_ledger_entry_id: self.director_ledger_entry_id,
                bank_transaction_id: self.bank_transaction_id,
            },
        )
    }

    /// True for a scheduled, not yet paid due.
    #[must_use]
    pub fn is_due(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}
