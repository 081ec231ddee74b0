//! Batch switch coordination.
//!
//! # Modules
//!
//! - `policy` - TRANSFER, NEW_FEE and SPLIT
//! - `planner` - Preconditions and the per-policy change set

pub mod planner;
pub mod policy;

#[cfg(test)]
mod planner_props;

pub use planner::{OldFeeDisposition, SwitchContext, SwitchPlan, SwitchPlanner};
pub use policy::SwitchPolicy;
