//! Shared fixture for repository integration tests.
//!
//! Every test gets its own in-memory SQLite database migrated with the
//! production migrator. The pool holds a single connection, so the database
//! lives exactly as long as the fixture.

#![allow(dead_code)]

use std::time::Duration;

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use sea_orm_migration::MigratorTrait;
use tuition_core::ActorContext;
use tuition_core::effects::{Committed, LedgerEffect};
use tuition_core::posting::CashTransactionType;
use tuition_db::entities::sea_orm_active_enums::PaymentStatus;
use tuition_db::entities::{batches, courses, fees, payments, students};
use tuition_db::repositories::{
    Admission, BankRepository, BatchSwitchRepository, CashEntryInput, CashPosting,
    CashbookRepository, CommunicationLogRepository, DirectorLedgerRepository, DirectoryRepository,
    EnrollmentRepository, FeeLedgerRepository, NewBatch, NewCourse, NewStudent,
    OccupancyRepository, PaymentRepository,
};
use tuition_db::{Migrator, connect_with};
use tuition_shared::types::{LocationId, UserId};
use uuid::Uuid;

pub const TX_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Ledger {
    pub db: DatabaseConnection,
    pub actor: ActorContext,
    pub directory: DirectoryRepository,
    pub enrollment: EnrollmentRepository,
    pub fees: FeeLedgerRepository,
    pub cash: CashbookRepository,
    pub directors: DirectorLedgerRepository,
    pub payments: PaymentRepository,
    pub bank: BankRepository,
    pub switches: BatchSwitchRepository,
    pub occupancy: OccupancyRepository,
    pub logs: CommunicationLogRepository,
}

/// A student admitted to a fresh batch.
pub struct Enrolled {
    pub student: students::Model,
    pub batch: batches::Model,
    pub fee: fees::Model,
}

impl Ledger {
    pub async fn new() -> Self {
        let db = connect_with("sqlite::memory:", 1, 1)
            .await
            .expect("connect sqlite");
        Migrator::up(&db, None).await.expect("migrate");

        let directory = DirectoryRepository::new(db.clone());
        let location = directory
            .create_location("Main campus")
            .await
            .expect("location");
        let actor = ActorContext::new(UserId::new(), LocationId::from_uuid(location.id));

        Self {
            actor,
            directory,
            enrollment: EnrollmentRepository::new(db.clone(), TX_TIMEOUT),
            fees: FeeLedgerRepository::new(db.clone(), TX_TIMEOUT),
            cash: CashbookRepository::new(db.clone(), TX_TIMEOUT),
            directors: DirectorLedgerRepository::new(db.clone(), TX_TIMEOUT),
            payments: PaymentRepository::new(db.clone(), TX_TIMEOUT),
            bank: BankRepository::new(db.clone(), TX_TIMEOUT),
            switches: BatchSwitchRepository::new(db.clone(), TX_TIMEOUT),
            occupancy: OccupancyRepository::new(db.clone()),
            logs: CommunicationLogRepository::new(db.clone()),
            db,
        }
    }

    pub fn location_id(&self) -> Uuid {
        self.actor.location_id.into_inner()
    }

    pub async fn course(&self, base_fee: i64) -> courses::Model {
        self.directory
            .create_course(NewCourse {
                name: format!("Course {base_fee}"),
                base_fee,
            })
            .await
            .expect("course")
    }

    pub async fn batch(&self, base_fee: i64, slot_limit: i32) -> batches::Model {
        let course = self.course(base_fee).await;
        self.directory
            .create_batch(NewBatch {
                course_id: course.id,
                location_id: self.location_id(),
                name: format!("Batch {}", Uuid::now_v7()),
                slot_limit,
            })
            .await
            .expect("batch")
    }

    pub async fn student(&self, name: &str) -> students::Model {
        self.directory
            .create_student(NewStudent {
                location_id: self.location_id(),
                name: name.to_string(),
                email: Some(format!("{}@example.com", name.to_lowercase())),
                phone: None,
            })
            .await
            .expect("student")
    }

    pub async fn admit(&self, student_id: Uuid, batch_id: Uuid) -> fees::Model {
        self.enrollment
            .admit(
                &self.actor,
                Admission {
                    student_id,
                    batch_id,
                    discount_amount: 0,
                    note: None,
                },
            )
            .await
            .expect("admit")
            .value
            .fee
    }

    /// A new student admitted to a new batch priced at `base_fee`.
    pub async fn enrolled(&self, name: &str, base_fee: i64) -> Enrolled {
        let batch = self.batch(base_fee, 10).await;
        let student = self.student(name).await;
        let fee = self.admit(student.id, batch.id).await;
        let student = self.directory.student(student.id).await.expect("student");
        let batch = self.directory.batch(batch.id).await.expect("batch");
        Enrolled {
            student,
            batch,
            fee,
        }
    }

    pub async fn cash_from(
        &self,
        student_id: Uuid,
        amount: i64,
    ) -> Committed<CashPosting> {
        self.cash
            .create(&self.actor, student_cash(student_id, amount))
            .await
            .expect("cash entry")
    }

    pub async fn fee(&self, fee_id: Uuid) -> fees::Model {
        self.fees.find_fee(fee_id).await.expect("fee")
    }

    pub async fn paid_payments(&self, fee_id: Uuid) -> Vec<payments::Model> {
        payments::Entity::find()
            .filter(payments::Column::FeeId.eq(fee_id))
            .filter(payments::Column::Status.eq(PaymentStatus::Paid))
            .all(&self.db)
            .await
            .expect("payments")
    }

    /// Checks `balance == max(final - paid, 0)` for a non-terminal fee.
    pub async fn assert_balance_invariant(&self, fee_id: Uuid) {
        let fee = self.fee(fee_id).await;
        let paid: i64 = self.paid_payments(fee_id).await.iter().map(|p| p.amount).sum();
        assert_eq!(
            fee.balance_amount.unwrap_or(fee.final_fee),
            (fee.final_fee - paid).max(0),
            "fee {fee_id} balance drifted from its payments"
        );
    }
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 17).expect("date")
}

pub fn student_cash(student_id: Uuid, amount: i64) -> CashEntryInput {
    CashEntryInput {
        transaction_date: today(),
        amount,
        transaction_type: CashTransactionType::StudentPaid,
        description: Some("fee installment".to_string()),
        reference_id: None,
        student_id: Some(student_id),
        director_id: None,
    }
}

pub fn completions<T>(committed: &Committed<T>) -> usize {
    committed
        .effects
        .iter()
        .filter(|e| matches!(e, LedgerEffect::FeeCompleted(_)))
        .count()
}

pub fn bookings<T>(committed: &Committed<T>) -> usize {
    committed
        .effects
        .iter()
        .filter(|e| matches!(e, LedgerEffect::AdvanceBooked(_)))
        .count()
}
