//! Side effects produced by committed ledger operations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tuition_shared::types::{BatchId, DirectorId, FeeId, LocationId, StudentId, UserId};

use crate::actor::ActorContext;
use crate::cache::CacheKey;

/// Audit event names written to the communication log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum AuditEventType {
    CashEntryAdded,
    CashEntryUpdated,
    CashEntryDeleted,
    DirectorLedgerEntryAdded,
    DirectorLedgerEntryUpdated,
    DirectorLedgerEntryDeleted,
    PaymentCreated,
    PaymentUpdated,
    PaymentDeleted,
    PaymentDueCreated,
    PaymentDueUpdated,
    PaymentDueDeleted,
    PaymentDueSettled,
    FeeUpdated,
    FeeRecomputed,
    StudentAdmitted,
    StudentWithdrawn,
    BatchSwitched,
    BankTransactionAdded,
    BankTransactionUpdated,
    BankTransactionDeleted,
}

impl AuditEventType {
    /// Returns the stored event name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CashEntryAdded => "CASH_ENTRY_ADDED",
            Self::CashEntryUpdated => "CASH_ENTRY_UPDATED",
            Self::CashEntryDeleted => "CASH_ENTRY_DELETED",
            Self::DirectorLedgerEntryAdded => "DIRECTOR_LEDGER_ENTRY_ADDED",
            Self::DirectorLedgerEntryUpdated => "DIRECTOR_LEDGER_ENTRY_UPDATED",
            Self::DirectorLedgerEntryDeleted => "DIRECTOR_LEDGER_ENTRY_DELETED",
            Self::PaymentCreated => "PAYMENT_CREATED",
            Self::PaymentUpdated => "PAYMENT_UPDATED",
            Self::PaymentDeleted => "PAYMENT_DELETED",
            Self::PaymentDueCreated => "PAYMENT_DUE_CREATED",
            Self::PaymentDueUpdated => "PAYMENT_DUE_UPDATED",
            Self::PaymentDueDeleted => "PAYMENT_DUE_DELETED",
            Self::PaymentDueSettled => "PAYMENT_DUE_SETTLED",
            Self::FeeUpdated => "FEE_UPDATED",
            Self::FeeRecomputed => "FEE_RECOMPUTED",
            Self::StudentAdmitted => "STUDENT_ADMITTED",
            Self::StudentWithdrawn => "STUDENT_WITHDRAWN",
            Self::BatchSwitched => "BATCH_SWITCHED",
            Self::BankTransactionAdded => "BANK_TRANSACTION_ADDED",
            Self::BankTransactionUpdated => "BANK_TRANSACTION_UPDATED",
            Self::BankTransactionDeleted => "BANK_TRANSACTION_DELETED",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit trail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Who acted.
    pub actor_id: UserId,
    /// What happened.
    pub event_type: AuditEventType,
    /// When it was committed.
    pub occurred_at: DateTime<Utc>,
    /// Short title.
    pub subject: String,
    /// Human readable description.
    pub message: String,
    /// Student concerned, if any.
    pub student_id: Option<StudentId>,
    /// Location the actor worked at.
    pub location_id: LocationId,
    /// Director concerned, if any.
    pub director_id: Option<DirectorId>,
    /// Batch concerned, if any.
    pub batch_id: Option<BatchId>,
}

impl AuditEvent {
    /// Starts an event for an actor.
    #[must_use]
    pub fn new(
        actor: &ActorContext,
        event_type: AuditEventType,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor.user_id,
            event_type,
            occurred_at: Utc::now(),
            subject: subject.into(),
            message: message.into(),
            student_id: None,
            location_id: actor.location_id,
            director_id: None,
            batch_id: None,
        }
    }

    /// Names the student concerned.
    #[must_use]
    pub const fn with_student(mut self, student_id: Option<StudentId>) -> Self {
        self.student_id = student_id;
        self
    }

    /// Names the director concerned.
    #[must_use]
    pub const fn with_director(mut self, director_id: Option<DirectorId>) -> Self {
        self.director_id = director_id;
        self
    }

    /// Names the batch concerned.
    #[must_use]
    pub const fn with_batch(mut self, batch_id: Option<BatchId>) -> Self {
        self.batch_id = batch_id;
        self
    }
}

/// Data for the "fee completed" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeCompletionNotice {
    /// The fee that reached zero.
    pub fee_id: FeeId,
    /// Its student.
    pub student_id: StudentId,
    /// Student name.
    pub student_name: String,
    /// Student email, when known.
    pub student_email: Option<String>,
    /// Course name.
    pub course_name: String,
    /// Final fee that was paid in full.
    pub final_fee: i64,
}

/// Data for the "seat booked" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingNotice {
    /// The fee that took the advance.
    pub fee_id: FeeId,
    /// Its student.
    pub student_id: StudentId,
    /// Student name.
    pub student_name: String,
    /// Student email, when known.
    pub student_email: Option<String>,
    /// Batch name.
    pub batch_name: String,
    /// Advance received.
    pub advance_amount: i64,
}

/// Something to do after a ledger transaction commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEffect {
    /// Drop cached views of a scope.
    Invalidate(CacheKey),
    /// Write an audit record.
    Audit(AuditEvent),
    /// Send the fee completion notification.
    FeeCompleted(FeeCompletionNotice),
    /// Send the booking confirmation.
    AdvanceBooked(BookingNotice),
}

/// Value of a committed operation plus the effects it owes.
#[derive(Debug, Clone)]
#[must_use = "effects must be dispatched after commit"]
pub struct Committed<T> {
    /// Result of the operation.
    pub value: T,
    /// Post-commit effects, in the order they were produced.
    pub effects: Vec<LedgerEffect>,
}

impl<T> Committed<T> {
    /// Wraps a value with its effects.
    pub const fn new(value: T, effects: Vec<LedgerEffect>) -> Self {
        Self { value, effects }
    }

    /// Splits into value and effects.
    pub fn into_parts(self) -> (T, Vec<LedgerEffect>) {
        (self.value, self.effects)
    }

    /// True if a fee completion notice is among the effects.
    #[must_use]
    pub fn completes_fee(&self, fee_id: FeeId) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, LedgerEffect::FeeCompleted(n) if n.fee_id == fee_id))
    }
}

/// Collects effects while an operation runs.
#[derive(Debug, Default)]
pub struct EffectSet {
    effects: Vec<LedgerEffect>,
}

impl EffectSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds cache scopes to drop.
    pub fn invalidate(&mut self, scopes: impl IntoIterator<Item = CacheKey>) -> &mut Self {
        self.effects
            .extend(scopes.into_iter().map(LedgerEffect::Invalidate));
        self
    }

    /// Adds an audit record.
    pub fn audit(&mut self, event: AuditEvent) -> &mut Self {
        self.effects.push(LedgerEffect::Audit(event));
        self
    }

    /// Adds a completion notice.
    pub fn fee_completed(&mut self, notice: FeeCompletionNotice) -> &mut Self {
        self.effects.push(LedgerEffect::FeeCompleted(notice));
        self
    }

    /// Adds a booking confirmation.
    pub fn advance_booked(&mut self, notice: BookingNotice) -> &mut Self {
        self.effects.push(LedgerEffect::AdvanceBooked(notice));
        self
    }

    /// Finishes with the committed value.
    pub fn commit<T>(self, value: T) -> Committed<T> {
        Committed::new(value, self.effects)
    }
}
