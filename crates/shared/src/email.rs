//! Email service for sending transactional emails.
//!
//! Uses `lettre` for SMTP transport.

use chrono::NaiveDate;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor, message::header::ContentType,
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::config::EmailConfig;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Outcome of a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the SMTP relay.
    Sent,
    /// Email is disabled in configuration; nothing was sent.
    Skipped,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    /// Creates a new email service.
    #[must_use]
    pub const fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Creates an SMTP transport.
    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| EmailError::SendError(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build()
            .pipe(Ok)
    }

    /// Tells a student their fee is fully paid.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_fee_completed(
        &self,
        to_email: &str,
        to_name: &str,
        course_name: &str,
        final_fee: i64,
    ) -> Result<Delivery, EmailError> {
        let subject = format!("Fee fully paid - {course_name}");
        let body = fee_completed_body(to_name, course_name, final_fee);
        self.send_email(to_email, &subject, &body).await
    }

    /// Confirms a seat booking after an advance payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_booking_confirmation(
        &self,
        to_email: &str,
        to_name: &str,
        batch_name: &str,
        advance_amount: i64,
    ) -> Result<Delivery, EmailError> {
        let subject = format!("Seat booked - {batch_name}");
        let body = booking_confirmation_body(to_name, batch_name, advance_amount);
        self.send_email(to_email, &subject, &body).await
    }

    /// Reminds a student of an installment due today.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_due_reminder(
        &self,
        to_email: &str,
        to_name: &str,
        amount: i64,
        due_date: NaiveDate,
    ) -> Result<Delivery, EmailError> {
        let body = due_reminder_body(to_name, amount, due_date);
        self.send_email(to_email, "Fee installment due today", &body)
            .await
    }

    /// Sends a generic email.
    ///
    /// # Errors
    ///
    /// Returns an error if the email cannot be sent.
    pub async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> Result<Delivery, EmailError> {
        let email = self.build_message(to_email, subject, body)?;

        if !self.config.enabled {
            tracing::debug!(to = to_email, subject, "email disabled, skipping send");
            return Ok(Delivery::Skipped);
        }

        let transport = self.create_transport()?;
        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        Ok(Delivery::Sent)
    }

    fn build_message(&self, to_email: &str, subject: &str, body: &str) -> Result<Message, EmailError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        Message::builder()
            .from(
                from.parse()
                    .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| EmailError::BuildError(e.to_string()))
    }
}

fn fee_completed_body(to_name: &str, course_name: &str, final_fee: i64) -> String {
    format!(
        r"Hi {to_name},

We have received your complete fee of {final_fee} for {course_name}.
Nothing further is owed on this enrollment.

Thank you,
Institute Accounts"
    )
}

fn booking_confirmation_body(to_name: &str, batch_name: &str, advance_amount: i64) -> String {
    format!(
        r"Hi {to_name},

Your seat in {batch_name} is booked. We received an advance of {advance_amount}.
The remaining fee is payable as per your installment schedule.

Thank you,
Institute Accounts"
    )
}

fn due_reminder_body(to_name: &str, amount: i64, due_date: NaiveDate) -> String {
    format!(
        r"Hi {to_name},

This is a reminder that a fee installment of {amount} is due today ({due_date}).
Please pay at the front desk or through your usual payment method.

Thank you,
Institute Accounts"
    )
}

/// Pipe trait for fluent API.
trait Pipe: Sized {
    fn pipe<F, R>(self, f: F) -> R
    where
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

impl<T> Pipe for T {}
