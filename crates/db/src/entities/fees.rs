//! `SeaORM` Entity for fees table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tuition_core::fee::FeeSnapshot;

use super::sea_orm_active_enums::FeeStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub student_id: Uuid,
    pub batch_id: Uuid,
    pub total_course_fee: i64,
    pub discount_amount: i64,
    pub carry_over_amount: i64,
    pub final_fee: i64,
    pub balance_amount: Option<i64>,
    pub advance_amount: Option<i64>,
    pub status: FeeStatus,
    pub is_locked: bool,
    pub transfer_id: Option<Uuid>,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::students::Entity",
        from = "Column::StudentId",
        to = "super::students::Column::Id"
    )]
    Students,
    #[sea_orm(
        belongs_to = "super::batches::Entity",
        from = "Column::BatchId",
        to = "super::batches::Column::Id"
    )]
    Batches,
}

impl Related<super::students::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Students.def()
    }
}

impl Related<super::batches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The balance-relevant view of this row.
    #[must_use]
    pub fn snapshot(&self) -> FeeSnapshot {
        FeeSnapshot {
            id: self.id,
            status: self.status.into(),
            total_course_fee: self.total_course_fee,
            discount_amount: self.discount_amount,
            carry_over_amount: self.carry_over_amount,
            final_fee: self.final_fee,
            balance_amount: self.balance_amount,
            frozen: self.is_locked,
        }
    }

    /// Amount still owed; an unset balance reads as the final fee.
    #[must_use]
    pub fn outstanding(&self) -> i64 {
        self.balance_amount.unwrap_or(self.final_fee)
    }
}
