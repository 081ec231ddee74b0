//! API route definitions.

use axum::Router;
use serde::Deserialize;
use tuition_shared::types::PageRequest;

use crate::AppState;

pub mod bank;
pub mod cash_entries;
pub mod directors;
pub mod directory;
pub mod fees;
pub mod health;
pub mod payments;
pub mod students;

/// Creates the API router with all ledger routes.
///
/// Every route here requires the actor headers; `/health` is mounted
/// separately.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(directory::routes())
        .merge(students::routes())
        .merge(fees::routes())
        .merge(cash_entries::routes())
        .merge(directors::routes())
        .merge(payments::routes())
        .merge(bank::routes())
}

/// Query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (default: 20, max: 100).
    pub per_page: Option<u32>,
    /// Skip the view cache.
    #[serde(default)]
    pub fresh: bool,
}

impl ListQuery {
    /// The requested page, pulled into valid bounds.
    pub fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
        .normalized()
    }
}
