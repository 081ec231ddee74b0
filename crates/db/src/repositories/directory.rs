//! Student, batch, course, location and director records.
//!
//! These are plain rows the ledger reads. Seat counts and batch pointers are
//! never written here; admission and switches own them.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tuition_core::{EntityKind, LedgerError};
use uuid::Uuid;

use super::support::{db_err, find_by_id, now};
use crate::entities::{batches, courses, directors, locations, students};

/// New course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    /// Display name.
    pub name: String,
    /// Fee charged for the course before discounts.
    pub base_fee: i64,
}

/// New batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatch {
    /// Course taught.
    pub course_id: Uuid,
    /// Location it runs at.
    pub location_id: Uuid,
    /// Display name.
    pub name: String,
    /// Seats available.
    pub slot_limit: i32,
}

/// New student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStudent {
    /// Home location.
    pub location_id: Uuid,
    /// Full name.
    pub name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
}

/// Directory repository.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    db: DatabaseConnection,
}

impl DirectoryRepository {
    /// Creates a new directory repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a location.
    pub async fn create_location(&self, name: &str) -> Result<locations::Model, LedgerError> {
        locations::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name.to_string()),
            created_at: Set(now()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)
    }

    /// Creates a course.
    pub async fn create_course(&self, input: NewCourse) -> Result<courses::Model, LedgerError> {
        if input.base_fee < 0 {
            return Err(LedgerError::Validation(format!(
                "base fee {} is negative",
                input.base_fee
            )));
        }
        courses::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(input.name),
            base_fee: Set(input.base_fee),
            created_at: Set(now()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)
    }

    /// Creates an empty batch.
    pub async fn create_batch(&self, input: NewBatch) -> Result<batches::Model, LedgerError> {
        if input.slot_limit < 0 {
            return Err(LedgerError::Validation(format!(
                "slot limit {} is negative",
                input.slot_limit
            )));
        }
        find_by_id::<courses::Entity, _>(&self.db, EntityKind::Course, input.course_id).await?;
        let timestamp = now();
        batches::ActiveModel {
            id: Set(Uuid::now_v7()),
            course_id: Set(input.course_id),
            location_id: Set(input.location_id),
            name: Set(input.name),
            slot_limit: Set(input.slot_limit),
            current_count: Set(0),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)
    }

    /// Creates a student outside any batch.
    pub async fn create_student(&self, input: NewStudent) -> Result<students::Model, LedgerError> {
        let timestamp = now();
        students::ActiveModel {
            id: Set(Uuid::now_v7()),
            location_id: Set(input.location_id),
            name: Set(input.name),
            email: Set(input.email),
            phone: Set(input.phone),
            current_batch_id: Set(None),
            created_at: Set(timestamp),
            updated_at: Set(timestamp),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)
    }

    /// Creates a director.
    pub async fn create_director(
        &self,
        name: &str,
        email: Option<String>,
    ) -> Result<directors::Model, LedgerError> {
        directors::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name.to_string()),
            email: Set(email),
            created_at: Set(now()),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)
    }

    /// Finds a student.
    pub async fn student(&self, student_id: Uuid) -> Result<students::Model, LedgerError> {
        find_by_id::<students::Entity, _>(&self.db, EntityKind::Student, student_id).await
    }

    /// Finds a batch.
    pub async fn batch(&self, batch_id: Uuid) -> Result<batches::Model, LedgerError> {
        find_by_id::<batches::Entity, _>(&self.db, EntityKind::Batch, batch_id).await
    }

    /// Students currently pointing at a batch.
    pub async fn roster(&self, batch_id: Uuid) -> Result<Vec<students::Model>, LedgerError> {
        students::Entity::find()
            .filter(students::Column::CurrentBatchId.eq(batch_id))
            .order_by_asc(students::Column::Name)
            .all(&self.db)
            .await
            .map_err(db_err)
    }
}
