//! Which posting source a payment's balance effect came from.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// The single source that funded a payment.
///
/// A payment row stores three nullable foreign keys. This enum is the only way
/// the rest of the code reads or writes them, so two origins at once cannot be
/// expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOrigin {
    /// Posted by a cash journal entry.
    Cash(Uuid),
    /// Posted by a director ledger entry.
    Director(Uuid),
    /// Posted by the payment recorder and reconciled to a bank transaction.
    Bank(Uuid),
    /// Posted by the payment recorder without a bank record.
    None,
}

/// Stored form of a payment origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OriginLinks {
    /// `payments.cash_entry_id`.
    pub cash_entry_id: Option<Uuid>,
    /// `payments.director_ledger_entry_id`.
    pub director_ledger_entry_id: Option<Uuid>,
    /// `payments.bank_transaction_id`.
    pub bank_transaction_id: Option<Uuid>,
}

impl PaymentOrigin {
    /// Reads the origin back from stored links.
    ///
    /// # Errors
    ///
    /// `ConsistencyViolation` if more than one link is set.
    pub fn from_links(payment_id: Uuid, links: OriginLinks) -> Result<Self, LedgerError> {
        match (
            links.cash_entry_id,
            links.director_ledger_entry_id,
            links.bank_transaction_id,
        ) {
            (None, None, None) => Ok(Self::None),
            (Some(id), None, None) => Ok(Self::Cash(id)),
            (None, Some(id), None) => Ok(Self::Director(id)),
            (None, None, Some(id)) => Ok(Self::Bank(id)),
            _ => Err(LedgerError::ConsistencyViolation(format!(
                "payment {payment_id} is linked to more than one posting source"
            ))),
        }
    }

    /// Stored links for this origin.
    #[must_use]
    pub const fn links(self) -> OriginLinks {
        let mut links = OriginLinks {
            cash_entry_id: None,
            director_ledger_entry_id: None,
            bank_transaction_id: None,
        };
        match self {
            Self::Cash(id) => links.cash_entry_id = Some(id),
            Self::Director(id) => links.director_ledger_entry_id = Some(id),
            Self::Bank(id) => links.bank_transaction_id = Some(id),
            Self::None => {}
        }
        links
    }

    /// True when a journal row owns the payment, so only that journal may change it.
    #[must_use]
    pub const fn is_journal_owned(self) -> bool {
        matches!(self, Self::Cash(_) | Self::Director(_))
    }

    /// The bank transaction behind this payment, if any.
    #[must_use]
    pub const fn bank_transaction(self) -> Option<Uuid> {
        match self {
            Self::Bank(id) => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_origin() -> impl Strategy<Value = PaymentOrigin> {
        prop_oneof![
            any::<u128>().prop_map(|n| PaymentOrigin::Cash(Uuid::from_u128(n))),
            any::<u128>().prop_map(|n| PaymentOrigin::Director(Uuid::from_u128(n))),
            any::<u128>().prop_map(|n| PaymentOrigin::Bank(Uuid::from_u128(n))),
            Just(PaymentOrigin::None),
        ]
    }

    proptest! {
        #[test]
        fn prop_links_hold_at_most_one_source(origin in arb_origin()) {
            let links = origin.links();
            let set = [
                links.cash_entry_id,
                links.director_ledger_entry_id,
                links.bank_transaction_id,
            ]
            .iter()
            .filter(|l| l.is_some())
            .count();
            prop_assert!(set <= 1);
            prop_assert_eq!(PaymentOrigin::from_links(Uuid::nil(), links).unwrap(), origin);
        }
    }

    #[test]
    fn test_two_links_is_a_consistency_violation() {
        let links = OriginLinks {
            cash_entry_id: Some(Uuid::from_u128(1)),
            director_ledger_entry_id: None,
            bank_transaction_id: Some(Uuid::from_u128(2)),
        };
        assert!(matches!(
            PaymentOrigin::from_links(Uuid::nil(), links),
            Err(LedgerError::ConsistencyViolation(_))
        ));
    }

    #[test]
    fn test_journal_ownership() {
        assert!(PaymentOrigin::Cash(Uuid::nil()).is_journal_owned());
        assert!(PaymentOrigin::Director(Uuid::nil()).is_journal_owned());
        assert!(!PaymentOrigin::Bank(Uuid::nil()).is_journal_owned());
        assert_eq!(
            PaymentOrigin::Bank(Uuid::from_u128(9)).bank_transaction(),
            Some(Uuid::from_u128(9))
        );
    }
}
