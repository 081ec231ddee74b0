//! `SeaORM` Entity for director_ledger_entries table.
//!
//! Rows with `source_cash_entry_id` set mirror an OWNER_TAKEN cash entry and
//! change only through it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{DebitCredit, DirectorTransactionType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "director_ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub director_id: Uuid,
    pub location_id: Uuid,
    pub transaction_date: Date,
    pub amount: i64,
    pub transaction_type: DirectorTransactionType,
    pub debit_credit: DebitCredit,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub reference_id: Option<String>,
    pub student_id: Option<Uuid>,
    pub bank_transaction_id: Option<Uuid>,
    pub source_cash_entry_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::directors::Entity",
        from = "Column::DirectorId",
        to = "super::directors::Column::Id"
    )]
    Directors,
    #[sea_orm(
        belongs_to = "super::cash_entries::Entity",
        from = "Column::SourceCashEntryId",
        to = "super::cash_entries::Column::Id"
    )]
    CashEntries,
}

impl Related<super::directors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Directors.def()
    }
}

impl Related<super::cash_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True if this row mirrors a cash entry.
    #[must_use]
    pub const fn is_mirror(&self) -> bool {
        self.source_cash_entry_id.is_some()
    }
}
