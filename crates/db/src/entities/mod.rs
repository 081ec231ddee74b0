//! `SeaORM` entity definitions.
//!
//! Directory tables (`locations`, `courses`, `batches`, `students`, `directors`)
//! are maintained elsewhere; the ledger only reads them, apart from
//! `students.current_batch_id` and `batches.current_count`.

pub mod prelude;

pub mod bank_accounts;
pub mod bank_transactions;
pub mod batch_histories;
pub mod batches;
pub mod cash_entries;
pub mod communication_logs;
pub mod courses;
pub mod director_ledger_entries;
pub mod directors;
pub mod fees;
pub mod locations;
pub mod payments;
pub mod sea_orm_active_enums;
pub mod students;
