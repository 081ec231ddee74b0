//! Repository abstractions for data access.
//!
//! Each mutating method runs one ledger operation as a single database
//! transaction and returns the committed value together with the side effects
//! the caller must dispatch afterwards.

mod fee_store;
mod support;

pub mod bank;
pub mod batch_switch;
pub mod cashbook;
pub mod communication_log;
pub mod director_ledger;
pub mod directory;
pub mod enrollment;
pub mod fee_ledger;
pub mod occupancy;
pub mod payment;

pub use bank::{BankRepository, CreateBankAccount, ManualBankTransaction};
pub use batch_switch::{BatchSwitchRepository, BatchSwitchRequest, SwitchOutcome};
pub use cashbook::{CashEntryInput, CashPosting, CashbookRepository};
pub use communication_log::CommunicationLogRepository;
pub use director_ledger::{DirectorEntryInput, DirectorLedgerRepository, DirectorPosting};
pub use directory::{DirectoryRepository, NewBatch, NewCourse, NewStudent};
pub use enrollment::{Admission, Admitted, EnrollmentRepository, Withdrawn};
pub use fee_ledger::FeeLedgerRepository;
pub use fee_store::FeePosting;
pub use occupancy::OccupancyRepository;
pub use payment::{DueInput, DueSettlement, DueUpdate, PaymentInput, PaymentRepository, RecordedPayment};
pub use support::{JournalPage, JournalTotals};
