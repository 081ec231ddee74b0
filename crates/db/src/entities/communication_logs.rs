//! `SeaORM` Entity for communication_logs table (the audit trail).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "communication_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub actor_id: Uuid,
    pub event_type: String,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub student_id: Option<Uuid>,
    pub location_id: Uuid,
    pub director_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub occurred_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
