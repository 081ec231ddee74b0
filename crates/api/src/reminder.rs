//! Daily due reminder.
//!
//! Once a day, at the configured local hour, emails every student whose
//! scheduled due falls on that local date. It only reads the ledger.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tokio::sync::mpsc;
use tuition_db::repositories::PaymentRepository;
use tuition_shared::config::ReminderConfig;
use tuition_shared::{Delivery, EmailService};

/// Invalid reminder settings.
#[derive(Debug, Error)]
pub enum ReminderError {
    /// The timezone is not an IANA name.
    #[error("unknown timezone: {0}")]
    Timezone(String),
    /// The hour is outside 0-23.
    #[error("reminder hour {0} is outside 0-23")]
    Hour(u32),
}

/// What one reminder run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReminderReport {
    /// Dues found for the day.
    pub due: usize,
    /// Emails handed to the relay.
    pub sent: usize,
    /// Emails not sent because email is disabled or the student has no address.
    pub skipped: usize,
    /// Emails that failed.
    pub failed: usize,
}

/// Background task sending due reminders.
pub struct DueReminder {
    payments: PaymentRepository,
    email: Arc<EmailService>,
    hour: u32,
    timezone: Tz,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running reminder task.
#[derive(Clone)]
pub struct ReminderHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl ReminderHandle {
    /// Asks the task to stop after its current run.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl DueReminder {
    /// Creates the task and its handle.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown timezone or an hour outside 0-23.
    pub fn new(
        payments: PaymentRepository,
        email: Arc<EmailService>,
        config: &ReminderConfig,
    ) -> Result<(Self, ReminderHandle), ReminderError> {
        let timezone: Tz = config
            .timezone
            .parse()
            .map_err(|_| ReminderError::Timezone(config.timezone.clone()))?;
        if config.hour > 23 {
            return Err(ReminderError::Hour(config.hour));
        }
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Ok((
            Self {
                payments,
                email,
                hour: config.hour,
                timezone,
                shutdown_rx,
            },
            ReminderHandle { shutdown_tx },
        ))
    }

    /// Runs until shut down. Spawn this as a background task.
    pub async fn run(mut self) {
        tracing::info!(hour = self.hour, timezone = %self.timezone, "due reminder starting");

        loop {
            let now = Utc::now();
            let Some(next) = next_run(now, self.hour, self.timezone) else {
                tracing::error!(hour = self.hour, "no valid reminder time, stopping");
                break;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(next_run = %next, "due reminder sleeping");

            tokio::select! {
                () = tokio::time::sleep(wait) => {
                    let today = next.with_timezone(&self.timezone).date_naive();
                    let report = self.send_for(today).await;
                    tracing::info!(
                        %today,
                        due = report.due,
                        sent = report.sent,
                        skipped = report.skipped,
                        failed = report.failed,
                        "due reminders sent"
                    );
                }
                _ = self.shutdown_rx.recv() => {
                    tracing::info!("due reminder shutting down");
                    break;
                }
            }
        }
    }

    /// Sends reminders for dues on `date`.
    pub async fn send_for(&self, date: NaiveDate) -> ReminderReport {
        let dues = match self.payments.dues_on(date).await {
            Ok(dues) => dues,
            Err(e) => {
                tracing::error!(error = %e, %date, "failed to read dues");
                return ReminderReport::default();
            }
        };

        let mut report = ReminderReport {
            due: dues.len(),
            ..ReminderReport::default()
        };
        for (due, student) in dues {
            let Some(to) = student.email.as_deref() else {
                report.skipped += 1;
                continue;
            };
            match self
                .email
                .send_due_reminder(to, &student.name, due.amount, date)
                .await
            {
                Ok(Delivery::Sent) => report.sent += 1,
                Ok(Delivery::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(payment_id = %due.id, error = %e, "due reminder failed");
                }
            }
        }
        report
    }
}

/// Next instant, strictly after `now`, at which the local clock in `tz` reads
/// `hour:00`.
pub fn next_run(now: DateTime<Utc>, hour: u32, tz: Tz) -> Option<DateTime<Utc>> {
    let local_today = now.with_timezone(&tz).date_naive();
    [local_today, local_today.succ_opt()?]
        .into_iter()
        .filter_map(|day| {
            let naive = day.and_hms_opt(hour, 0, 0)?;
            tz.from_local_datetime(&naive).earliest()
        })
        .map(|local| local.with_timezone(&Utc))
        .find(|at| *at > now)
}
