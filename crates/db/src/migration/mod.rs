//! Schema migrations for the ledger tables.
//!
//! Run them with the `migrator` binary, or call [`Migrator::up`] directly as
//! the integration tests do against in-memory SQLite.

pub use sea_orm_migration::prelude::*;

mod m20260108_000001_initial;

/// Applies the directory, fee ledger, posting and audit tables in order.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260108_000001_initial::Migration)]
    }
}
