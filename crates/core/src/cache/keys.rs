//! Cache scopes and the scopes each kind of mutation invalidates.

use std::fmt;

use serde::{Deserialize, Serialize};
use tuition_shared::types::{BatchId, DirectorId, LocationId, StudentId};

/// A family of cached read views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum CacheKey {
    /// Fee list of a student.
    StudentFees(StudentId),
    /// Payment and due list of a student.
    StudentPayments(StudentId),
    /// Batch history of a student.
    StudentHistory(StudentId),
    /// Students and seats of a batch.
    BatchRoster(BatchId),
    /// Collection figures of a location.
    LocationDashboard(LocationId),
    /// Cash journal of a location.
    LocationCashbook(LocationId),
    /// Ledger of a director.
    DirectorLedger(DirectorId),
    /// Bank accounts and balances.
    BankAccounts,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StudentFees(id) => write!(f, "student:{id}:fees"),
            Self::StudentPayments(id) => write!(f, "student:{id}:payments"),
            Self::StudentHistory(id) => write!(f, "student:{id}:history"),
            Self::BatchRoster(id) => write!(f, "batch:{id}:roster"),
            Self::LocationDashboard(id) => write!(f, "location:{id}:dashboard"),
            Self::LocationCashbook(id) => write!(f, "location:{id}:cashbook"),
            Self::DirectorLedger(id) => write!(f, "director:{id}:ledger"),
            Self::BankAccounts => f.write_str("bank:accounts"),
        }
    }
}

/// One cached rendering of a scope, e.g. a particular page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    /// Scope invalidated as a unit.
    pub scope: CacheKey,
    /// Distinguishes renderings within the scope.
    pub variant: String,
}

impl ViewKey {
    /// Creates a view key.
    #[must_use]
    pub fn new(scope: CacheKey, variant: impl Into<String>) -> Self {
        Self {
            scope,
            variant: variant.into(),
        }
    }
}

/// Scopes touched when a fee's balance or payments change.
#[must_use]
pub fn fee_scopes(student: StudentId, batch: BatchId, location: LocationId) -> Vec<CacheKey> {
    vec![
        CacheKey::StudentFees(student),
        CacheKey::StudentPayments(student),
        CacheKey::BatchRoster(batch),
        CacheKey::LocationDashboard(location),
    ]
}

/// Scopes touched by any cash journal row.
#[must_use]
pub fn cashbook_scopes(location: LocationId) -> Vec<CacheKey> {
    vec![
        CacheKey::LocationCashbook(location),
        CacheKey::LocationDashboard(location),
    ]
}

/// Scopes touched by any director ledger row.
#[must_use]
pub fn director_scopes(director: DirectorId) -> Vec<CacheKey> {
    vec![CacheKey::DirectorLedger(director)]
}

/// Scopes touched by any bank balance change.
#[must_use]
pub fn bank_scopes() -> Vec<CacheKey> {
    vec![CacheKey::BankAccounts]
}

/// Scopes touched by a batch switch.
#[must_use]
pub fn switch_scopes(
    student: StudentId,
    from: BatchId,
    to: BatchId,
    location: LocationId,
) -> Vec<CacheKey> {
    let mut scopes = fee_scopes(student, from, location);
    scopes.push(CacheKey::BatchRoster(to));
    scopes.push(CacheKey::StudentHistory(student));
    scopes
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_switch_touches_both_rosters() {
        let student = StudentId::from_uuid(Uuid::from_u128(1));
        let from = BatchId::from_uuid(Uuid::from_u128(2));
        let to = BatchId::from_uuid(Uuid::from_u128(3));
        let location = LocationId::from_uuid(Uuid::from_u128(4));

        let scopes = switch_scopes(student, from, to, location);
        assert!(scopes.contains(&CacheKey::BatchRoster(from)));
        assert!(scopes.contains(&CacheKey::BatchRoster(to)));
        assert!(scopes.contains(&CacheKey::StudentHistory(student)));
        assert!(scopes.contains(&CacheKey::LocationDashboard(location)));
    }

    #[test]
    fn test_display_is_stable() {
        let location = LocationId::from_uuid(Uuid::nil());
        assert_eq!(
            CacheKey::LocationCashbook(location).to_string(),
            format!("location:{}:cashbook", Uuid::nil())
        );
        assert_eq!(CacheKey::BankAccounts.to_string(), "bank:accounts");
    }
}
