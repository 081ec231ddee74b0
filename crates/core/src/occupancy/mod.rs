//! Batch seat accounting.
//!
//! The store performs the actual check-and-increment in one conditional
//! update; [`SeatCount`] mirrors those rules for planning and for reporting
//! why a reservation failed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

#[cfg(test)]
mod seat_props;

/// Seat usage of one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatCount {
    /// The batch.
    pub batch_id: Uuid,
    /// Capacity.
    pub slot_limit: i32,
    /// Occupied seats.
    pub current_count: i32,
}

impl SeatCount {
    /// True while at least one seat is free.
    #[must_use]
    pub const fn has_free_seat(&self) -> bool {
        self.current_count < self.slot_limit
    }

    /// Seats still free.
    #[must_use]
    pub fn free_seats(&self) -> i32 {
        (self.slot_limit - self.current_count).max(0)
    }

    /// Takes one seat.
    ///
    /// # Errors
    ///
    /// `BatchFull` when no seat is free.
    pub fn reserve(self) -> Result<Self, LedgerError> {
        if !self.has_free_seat() {
            return Err(LedgerError::BatchFull {
                batch_id: self.batch_id,
                slot_limit: self.slot_limit,
            });
        }
        Ok(Self {
            current_count: self.current_count + 1,
            ..self
        })
    }

    /// Gives one seat back.
    ///
    /// # Errors
    ///
    /// `ConsistencyViolation` when the count is already zero, which means a
    /// student was counted nowhere.
    pub fn release(self) -> Result<Self, LedgerError> {
        if self.current_count <= 0 {
            return Err(LedgerError::ConsistencyViolation(format!(
                "batch {} has no occupied seat to release",
                self.batch_id
            )));
        }
        Ok(Self {
            current_count: self.current_count - 1,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats(slot_limit: i32, current_count: i32) -> SeatCount {
        SeatCount {
            batch_id: Uuid::nil(),
            slot_limit,
            current_count,
        }
    }

    #[test]
    fn test_reserve_until_full() {
        let one_left = seats(2, 1);
        let full = one_left.reserve().unwrap();
        assert_eq!(full.current_count, 2);
        assert_eq!(full.free_seats(), 0);
        assert!(matches!(
            full.reserve(),
            Err(LedgerError::BatchFull { slot_limit: 2, .. })
        ));
    }

    #[test]
    fn test_release_at_zero_is_inconsistent() {
        assert!(matches!(
            seats(5, 0).release(),
            Err(LedgerError::ConsistencyViolation(_))
        ));
        assert_eq!(seats(5, 3).release().unwrap().current_count, 2);
    }
}
