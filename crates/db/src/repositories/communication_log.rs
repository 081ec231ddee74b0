//! Audit trail stored in `communication_logs`.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tuition_core::LedgerError;
use tuition_core::effects::{AuditEvent, AuditTrail, SideEffectError};
use tuition_shared::types::{PageRequest, PageResponse};
use uuid::Uuid;

use super::support::{db_err, fetch_page};
use crate::entities::communication_logs;

/// Communication log repository.
#[derive(Debug, Clone)]
pub struct CommunicationLogRepository {
    db: DatabaseConnection,
}

impl CommunicationLogRepository {
    /// Creates a new communication log repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists the audit events naming a student, newest first.
    pub async fn list_for_student(
        &self,
        student_id: Uuid,
        page: &PageRequest,
    ) -> Result<PageResponse<communication_logs::Model>, LedgerError> {
        let query = communication_logs::Entity::find()
            .filter(communication_logs::Column::StudentId.eq(student_id))
            .order_by_desc(communication_logs::Column::OccurredAt);
        fetch_page(&self.db, query, page).await
    }
}

#[async_trait]
impl AuditTrail for CommunicationLogRepository {
    async fn record(&self, event: &AuditEvent) -> Result<(), SideEffectError> {
        communication_logs::ActiveModel {
            id: Set(Uuid::now_v7()),
            actor_id: Set(event.actor_id.into_inner()),
            event_type: Set(event.event_type.as_str().to_string()),
            subject: Set(event.subject.clone()),
            message: Set(event.message.clone()),
            student_id: Set(event.student_id.map(|id| id.into_inner())),
            location_id: Set(event.location_id.into_inner()),
            director_id: Set(event.director_id.map(|id| id.into_inner())),
            batch_id: Set(event.batch_id.map(|id| id.into_inner())),
            occurred_at: Set(event.occurred_at.fixed_offset()),
        }
        .insert(&self.db)
        .await
        .map_err(|e| SideEffectError::Audit(db_err(e).to_string()))?;
        Ok(())
    }
}
