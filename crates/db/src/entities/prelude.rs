//! Entity re-exports.

pub use super::bank_accounts::Entity as BankAccounts;
pub use super::bank_transactions::Entity as BankTransactions;
pub use super::batch_histories::Entity as BatchHistories;
pub use super::batches::Entity as Batches;
pub use super::cash_entries::Entity as CashEntries;
pub use super::communication_logs::Entity as CommunicationLogs;
pub use super::courses::Entity as Courses;
pub use super::director_ledger_entries::Entity as DirectorLedgerEntries;
pub use super::directors::Entity as Directors;
pub use super::fees::Entity as Fees;
pub use super::locations::Entity as Locations;
pub use super::payments::Entity as Payments;
pub use super::students::Entity as Students;
