//! `SeaORM` Entity for batches table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tuition_core::occupancy::SeatCount;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub course_id: Uuid,
    pub location_id: Uuid,
    pub name: String,
    pub slot_limit: i32,
    pub current_count: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::courses::Entity",
        from = "Column::CourseId",
        to = "super::courses::Column::Id"
    )]
    Courses,
    #[sea_orm(
        belongs_to = "super::locations::Entity",
        from = "Column::LocationId",
        to = "super::locations::Column::Id"
    )]
    Locations,
}

impl Related<super::courses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Courses.def()
    }
}

impl Related<super::locations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Locations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Seat figures of this batch.
    #[must_use]
    pub const fn seats(&self) -> SeatCount {
        SeatCount {
            batch_id: self.id,
            slot_limit: self.slot_limit,
            current_count: self.current_count,
        }
    }
}
