//! Post-commit effect dispatch.
//!
//! Collaborators are injected as trait objects. None of them can fail a ledger
//! operation: by the time effects run the transaction has committed, so every
//! failure is logged and counted, then dropped.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::cache::CacheKey;
use crate::effects::types::{AuditEvent, BookingNotice, FeeCompletionNotice, LedgerEffect};

/// Failure of a side channel.
#[derive(Debug, Error)]
pub enum SideEffectError {
    /// The audit trail could not be written.
    #[error("audit trail unavailable: {0}")]
    Audit(String),
    /// A notification could not be sent.
    #[error("notification failed: {0}")]
    Notification(String),
}

/// Receives audit records after every committed mutation.
#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Records one event.
    async fn record(&self, event: &AuditEvent) -> Result<(), SideEffectError>;
}

/// Sends student-facing notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A fee reached a zero balance.
    async fn fee_completed(&self, notice: &FeeCompletionNotice) -> Result<(), SideEffectError>;

    /// An advance booking was taken.
    async fn advance_booked(&self, notice: &BookingNotice) -> Result<(), SideEffectError>;
}

/// Drops cached read views.
pub trait ViewInvalidator: Send + Sync {
    /// Drops every cached view of a scope.
    fn invalidate(&self, scope: &CacheKey);
}

/// Counts of what a dispatch did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Scopes invalidated.
    pub invalidated: usize,
    /// Audit records written.
    pub audited: usize,
    /// Notifications sent.
    pub notified: usize,
    /// Side effects that failed and were swallowed.
    pub failed: usize,
}

/// Runs post-commit effects against the injected collaborators.
#[derive(Clone)]
pub struct EffectDispatcher {
    audit: Arc<dyn AuditTrail>,
    notifier: Arc<dyn Notifier>,
    views: Arc<dyn ViewInvalidator>,
}

impl EffectDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        audit: Arc<dyn AuditTrail>,
        notifier: Arc<dyn Notifier>,
        views: Arc<dyn ViewInvalidator>,
    ) -> Self {
        Self {
            audit,
            notifier,
            views,
        }
    }

    /// Runs effects: cache invalidation first, then audit, then notifications.
    ///
    /// Duplicate scopes are invalidated once, and each fee gets at most one
    /// completion notice per dispatch.
    pub async fn dispatch(&self, effects: Vec<LedgerEffect>) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut scopes = Vec::new();
        let mut seen_scopes = HashSet::new();
        let mut audits = Vec::new();
        let mut notices = Vec::new();

        for effect in effects {
            match effect {
                LedgerEffect::Invalidate(scope) => {
                    if seen_scopes.insert(scope) {
                        scopes.push(scope);
                    }
                }
                LedgerEffect::Audit(event) => audits.push(event),
                other => notices.push(other),
            }
        }

        for scope in &scopes {
            self.views.invalidate(scope);
            report.invalidated += 1;
        }

        for event in &audits {
            match self.audit.record(event).await {
                Ok(()) => report.audited += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        event_type = %event.event_type,
                        error = %e,
                        "audit record dropped"
                    );
                }
            }
        }

        let mut completed_fees = HashSet::new();
        for notice in &notices {
            let result = match notice {
                LedgerEffect::FeeCompleted(n) => {
                    if !completed_fees.insert(n.fee_id) {
                        continue;
                    }
                    self.notifier.fee_completed(n).await
                }
                LedgerEffect::AdvanceBooked(n) => self.notifier.advance_booked(n).await,
                LedgerEffect::Invalidate(_) | LedgerEffect::Audit(_) => continue,
            };
            match result {
                Ok(()) => report.notified += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(error = %e, "notification dropped");
                }
            }
        }

        tracing::debug!(?report, "post-commit effects dispatched");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorContext;
    use crate::effects::types::{AuditEventType, EffectSet};
    use std::sync::Mutex;
    use tuition_shared::types::{FeeId, LocationId, StudentId, UserId};
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingAudit {
        events: Mutex<Vec<AuditEventType>>,
        fail: bool,
    }

    #[async_trait]
    impl AuditTrail for RecordingAudit {
        async fn record(&self, event: &AuditEvent) -> Result<(), SideEffectError> {
            if self.fail {
                return Err(SideEffectError::Audit("log table locked".into()));
            }
            self.events.lock().unwrap().push(event.event_type);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        completed: Mutex<Vec<FeeId>>,
        booked: Mutex<Vec<FeeId>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn fee_completed(&self, notice: &FeeCompletionNotice) -> Result<(), SideEffectError> {
            self.completed.lock().unwrap().push(notice.fee_id);
            Ok(())
        }

        async fn advance_booked(&self, notice: &BookingNotice) -> Result<(), SideEffectError> {
            self.booked.lock().unwrap().push(notice.fee_id);
            Err(SideEffectError::Notification("smtp down".into()))
        }
    }

    #[derive(Default)]
    struct RecordingViews {
        scopes: Mutex<Vec<CacheKey>>,
    }

    impl ViewInvalidator for RecordingViews {
        fn invalidate(&self, scope: &CacheKey) {
            self.scopes.lock().unwrap().push(*scope);
        }
    }

    fn actor() -> ActorContext {
        ActorContext::new(UserId::new(), LocationId::new())
    }

    fn completion(fee_id: FeeId) -> FeeCompletionNotice {
        FeeCompletionNotice {
            fee_id,
            student_id: StudentId::new(),
            student_name: "Asha".into(),
            student_email: Some("asha@example.com".into()),
            course_name: "JEE".into(),
            final_fee: 30_000,
        }
    }

    #[tokio::test]
    async fn test_dispatch_dedupes_scopes_and_completions() {
        let audit = Arc::new(RecordingAudit::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let views = Arc::new(RecordingViews::default());
        let dispatcher = EffectDispatcher::new(audit.clone(), notifier.clone(), views.clone());

        let fee_id = FeeId::from_uuid(Uuid::from_u128(7));
        let scope = CacheKey::BankAccounts;
        let mut effects = EffectSet::new();
        effects
            .invalidate([scope, scope])
            .audit(AuditEvent::new(
                &actor(),
                AuditEventType::CashEntryAdded,
                "Cash entry",
                "added",
            ))
            .fee_completed(completion(fee_id))
            .fee_completed(completion(fee_id));

        let report = dispatcher.dispatch(effects.commit(()).effects).await;

        assert_eq!(report.invalidated, 1);
        assert_eq!(report.audited, 1);
        assert_eq!(report.notified, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(*notifier.completed.lock().unwrap(), vec![fee_id]);
        assert_eq!(*views.scopes.lock().unwrap(), vec![scope]);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed_and_counted() {
        let audit = Arc::new(RecordingAudit {
            fail: true,
            ..RecordingAudit::default()
        });
        let notifier = Arc::new(RecordingNotifier::default());
        let views = Arc::new(RecordingViews::default());
        let dispatcher = EffectDispatcher::new(audit, notifier.clone(), views);

        let mut effects = EffectSet::new();
        effects
            .audit(AuditEvent::new(
                &actor(),
                AuditEventType::PaymentCreated,
                "Payment",
                "recorded",
            ))
            .advance_booked(BookingNotice {
                fee_id: FeeId::new(),
                student_id: StudentId::new(),
                student_name: "Ravi".into(),
                student_email: None,
                batch_name: "Morning A".into(),
                advance_amount: 5_000,
            });

        let report = dispatcher.dispatch(effects.commit(()).effects).await;
        assert_eq!(report.failed, 2);
        assert_eq!(report.audited, 0);
        assert_eq!(notifier.booked.lock().unwrap().len(), 1);
    }
}
