//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for every ledger operation
//! - Actor extraction from gateway headers
//! - The email notifier and daily due reminder
//! - Error rendering

pub mod error;
pub mod middleware;
pub mod notifier;
pub mod reminder;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tuition_core::cache::{CacheKey, ViewCache, ViewKey};
use tuition_core::effects::{Committed, DispatchReport, EffectDispatcher};
use tuition_db::repositories::{
    BankRepository, BatchSwitchRepository, CashbookRepository, CommunicationLogRepository,
    DirectorLedgerRepository, DirectoryRepository, EnrollmentRepository, FeeLedgerRepository,
    OccupancyRepository, PaymentRepository,
};
use tuition_shared::EmailService;

pub use error::ApiError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Upper bound on one ledger transaction.
    pub tx_timeout: Duration,
    /// Runs post-commit effects.
    pub dispatcher: EffectDispatcher,
    /// Rendered list views.
    pub views: ViewCache,
    /// Email service for notifications.
    pub email_service: Arc<EmailService>,
}

impl AppState {
    fn conn(&self) -> DatabaseConnection {
        (*self.db).clone()
    }

    /// Directory of students, batches and people.
    pub fn directory(&self) -> DirectoryRepository {
        DirectoryRepository::new(self.conn())
    }

    /// Admission and withdrawal.
    pub fn enrollment(&self) -> EnrollmentRepository {
        EnrollmentRepository::new(self.conn(), self.tx_timeout)
    }

    /// Fee reads and corrections.
    pub fn fees(&self) -> FeeLedgerRepository {
        FeeLedgerRepository::new(self.conn(), self.tx_timeout)
    }

    /// Location cash journal.
    pub fn cashbook(&self) -> CashbookRepository {
        CashbookRepository::new(self.conn(), self.tx_timeout)
    }

    /// Director ledgers.
    pub fn director_ledger(&self) -> DirectorLedgerRepository {
        DirectorLedgerRepository::new(self.conn(), self.tx_timeout)
    }

    /// Direct payments and dues.
    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.conn(), self.tx_timeout)
    }

    /// Bank accounts and manual transactions.
    pub fn bank(&self) -> BankRepository {
        BankRepository::new(self.conn(), self.tx_timeout)
    }

    /// Batch switches.
    pub fn switches(&self) -> BatchSwitchRepository {
        BatchSwitchRepository::new(self.conn(), self.tx_timeout)
    }

    /// Seat counts.
    pub fn occupancy(&self) -> OccupancyRepository {
        OccupancyRepository::new(self.conn())
    }

    /// Audit log reads.
    pub fn logs(&self) -> CommunicationLogRepository {
        CommunicationLogRepository::new(self.conn())
    }

    /// Runs the effects of a committed operation and hands back its value.
    pub async fn finish<T>(&self, committed: Committed<T>) -> T {
        let (value, effects) = committed.into_parts();
        let report: DispatchReport = self.dispatcher.dispatch(effects).await;
        if report.failed > 0 {
            tracing::warn!(failed = report.failed, "side effects dropped after commit");
        }
        value
    }

    /// Serves a list view from the cache, loading and storing it on a miss.
    /// `fresh` skips the lookup but still refreshes the stored copy.
    pub async fn cached<T, F>(
        &self,
        scope: CacheKey,
        variant: String,
        fresh: bool,
        load: F,
    ) -> Result<Value, ApiError>
    where
        T: Serialize,
        F: Future<Output = Result<T, tuition_core::LedgerError>>,
    {
        let key = ViewKey::new(scope, variant);
        if !fresh && let Some(hit) = self.views.get(&key) {
            return Ok((*hit).clone());
        }
        let view = serde_json::to_value(load.await?)
            .map_err(|e| ApiError::internal(format!("failed to render view: {e}")))?;
        self.views.insert(key, view.clone());
        Ok(view)
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
