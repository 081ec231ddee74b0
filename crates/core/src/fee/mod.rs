//! Fee records and their balance arithmetic.
//!
//! # Modules
//!
//! - `types` - Fee status, snapshots, balance updates and creation terms
//! - `ledger` - Apply, reverse, adjust and recompute

pub mod ledger;
pub mod types;

#[cfg(test)]
mod ledger_props;

pub use ledger::FeeLedger;
pub use types::{BalanceUpdate, FeeSnapshot, FeeStatus, FeeTerms};
