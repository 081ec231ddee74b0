//! Email delivery of ledger notifications.

use std::sync::Arc;

use async_trait::async_trait;
use tuition_core::effects::{BookingNotice, FeeCompletionNotice, Notifier, SideEffectError};
use tuition_shared::{Delivery, EmailService};

/// Sends notifications through the SMTP email service.
#[derive(Clone)]
pub struct EmailNotifier {
    email: Arc<EmailService>,
}

impl EmailNotifier {
    /// Creates a notifier.
    #[must_use]
    pub const fn new(email: Arc<EmailService>) -> Self {
        Self { email }
    }
}

fn log_delivery(kind: &str, student: &str, delivery: Delivery) {
    match delivery {
        Delivery::Sent => tracing::info!(kind, student, "notification sent"),
        Delivery::Skipped => tracing::debug!(kind, student, "notification skipped"),
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn fee_completed(&self, notice: &FeeCompletionNotice) -> Result<(), SideEffectError> {
        let Some(to) = notice.student_email.as_deref() else {
            tracing::debug!(student_id = %notice.student_id, "no email on file, completion not sent");
            return Ok(());
        };
        let delivery = self
            .email
            .send_fee_completed(to, &notice.student_name, &notice.course_name, notice.final_fee)
            .await
            .map_err(|e| SideEffectError::Notification(e.to_string()))?;
        log_delivery("fee_completed", &notice.student_name, delivery);
        Ok(())
    }

    async fn advance_booked(&self, notice: &BookingNotice) -> Result<(), SideEffectError> {
        let Some(to) = notice.student_email.as_deref() else {
            tracing::debug!(student_id = %notice.student_id, "no email on file, booking not sent");
            return Ok(());
        };
        let delivery = self
            .email
            .send_booking_confirmation(
                to,
                &notice.student_name,
                &notice.batch_name,
                notice.advance_amount,
            )
            .await
            .map_err(|e| SideEffectError::Notification(e.to_string()))?;
        log_delivery("advance_booked", &notice.student_name, delivery);
        Ok(())
    }
}
