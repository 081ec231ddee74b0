//! Property-based tests for seat conservation.
//!
//! Drives random admissions, withdrawals and switches through `SeatCount` and
//! checks that every batch count equals the number of students assigned to it.

use std::collections::HashMap;

use proptest::prelude::*;
use uuid::Uuid;

use crate::occupancy::SeatCount;

#[derive(Debug, Clone)]
enum Op {
    Admit { student: usize, batch: usize },
    Withdraw { student: usize },
    Switch { student: usize, to: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..6, 0usize..3).prop_map(|(student, batch)| Op::Admit { student, batch }),
        (0usize..6).prop_map(|student| Op::Withdraw { student }),
        (0usize..6, 0usize..3).prop_map(|(student, to)| Op::Switch { student, to }),
    ]
}

/// Applies one operation the way the store does: all of it or none of it.
fn apply(op: &Op, seats: &mut [SeatCount], assigned: &mut HashMap<usize, usize>) {
    match *op {
        Op::Admit { student, batch } => {
            if assigned.contains_key(&student) {
                return;
            }
            if let Ok(next) = seats[batch].reserve() {
                seats[batch] = next;
                assigned.insert(student, batch);
            }
        }
        Op::Withdraw { student } => {
            if let Some(batch) = assigned.get(&student).copied() {
                let released = seats[batch].release().unwrap();
                seats[batch] = released;
                assigned.remove(&student);
            }
        }
        Op::Switch { student, to } => {
            let Some(from) = assigned.get(&student).copied() else {
                return;
            };
            if from == to {
                return;
            }
            let Ok(reserved) = seats[to].reserve() else {
                return;
            };
            let released = seats[from].release().unwrap();
            seats[to] = reserved;
            seats[from] = released;
            assigned.insert(student, to);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_counts_match_assignments(
        limits in prop::collection::vec(1i32..4, 3),
        ops in prop::collection::vec(arb_op(), 0..40),
    ) {
        let mut seats: Vec<SeatCount> = limits
            .iter()
            .enumerate()
            .map(|(i, &slot_limit)| SeatCount {
                batch_id: Uuid::from_u128(i as u128),
                slot_limit,
                current_count: 0,
            })
            .collect();
        let mut assigned = HashMap::new();

        for op in &ops {
            apply(op, &mut seats, &mut assigned);

            for (index, seat) in seats.iter().enumerate() {
                let pointing = assigned.values().filter(|&&b| b == index).count();
                prop_assert_eq!(usize::try_from(seat.current_count).unwrap(), pointing);
                prop_assert!(seat.current_count <= seat.slot_limit);
            }
        }
    }
}
