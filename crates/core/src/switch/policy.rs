//! Batch switch settlement policies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// How a student's fee is settled when they change batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwitchPolicy {
    /// Keep the existing fee unchanged.
    Transfer,
    /// Replace the fee with one priced at the destination and move its payments over.
    NewFee,
    /// Freeze the old fee with its payments and open a new one for the rest.
    Split,
}

impl SwitchPolicy {
    /// Returns the string representation of the policy.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "TRANSFER",
            Self::NewFee => "NEW_FEE",
            Self::Split => "SPLIT",
        }
    }
}

impl fmt::Display for SwitchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SwitchPolicy {
    type Err = LedgerError;

    /// Only the three exact policy names parse; nothing falls back to a default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TRANSFER" => Ok(Self::Transfer),
            "NEW_FEE" => Ok(Self::NewFee),
            "SPLIT" => Ok(Self::Split),
            other => Err(LedgerError::UnknownPolicy(other.to_string())),
        }
    }
}
