//! Post-commit side effects: audit trail, notifications and cache invalidation.
//!
//! # Modules
//!
//! - `types` - Audit events, notices and the `Committed` wrapper
//! - `dispatcher` - Collaborator traits and best-effort dispatch

pub mod dispatcher;
pub mod types;

pub use dispatcher::{
    AuditTrail, DispatchReport, EffectDispatcher, Notifier, SideEffectError, ViewInvalidator,
};
pub use types::{
    AuditEvent, AuditEventType, BookingNotice, Committed, EffectSet, FeeCompletionNotice,
    LedgerEffect,
};
