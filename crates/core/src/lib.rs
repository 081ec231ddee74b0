//! Core ledger logic for the tuition ledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Repositories in `tuition-db` call into it for every balance, seat and switch
//! decision, then persist the result inside one transaction.
//!
//! # Modules
//!
//! - `fee` - Fee status and balance arithmetic
//! - `posting` - Cash journal, director ledger and payment recorder rules
//! - `occupancy` - Batch seat accounting
//! - `switch` - Batch switch policies and planning
//! - `effects` - Audit, notification and cache side effects
//! - `cache` - Read-view cache keys and store

pub mod actor;
pub mod cache;
pub mod effects;
pub mod error;
pub mod fee;
pub mod occupancy;
pub mod posting;
pub mod switch;

pub use actor::ActorContext;
pub use error::{EntityKind, ErrorKind, LedgerError};
