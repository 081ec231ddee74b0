//! Bank linkage transitions for editable postings.
//!
//! A posting is either bank-routed or not, before and after an edit. The four
//! combinations map onto create / adjust / remove steps that the repository
//! layer runs against `bank_transactions` and `bank_accounts`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;
use crate::posting::types::DebitCredit;

/// Bank side of a posting: which account and how much.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankLink {
    /// The account that moves.
    pub account_id: Uuid,
    /// Unsigned amount.
    pub amount: i64,
}

/// A bank link that already has a stored transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingBankLink {
    /// The stored bank transaction.
    pub transaction_id: Uuid,
    /// Its account and amount.
    pub link: BankLink,
}

/// One storage step of a bank transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankStep {
    /// Insert a transaction and move the balance by its signed amount.
    Create(BankLink),
    /// Rewrite the amount of a transaction and move the balance by the difference.
    Adjust {
        /// The stored transaction.
        transaction_id: Uuid,
        /// Its account.
        account_id: Uuid,
        /// New unsigned amount.
        new_amount: i64,
        /// `new_amount - old_amount`.
        delta: i64,
    },
    /// Delete a transaction and take its signed amount back out of the balance.
    Remove {
        /// The stored transaction.
        transaction_id: Uuid,
        /// Its account and amount.
        link: BankLink,
    },
}

/// Plans the steps that turn the old bank linkage into the new one.
///
/// Moving to a different account is a removal followed by a creation. Removals
/// come last so that callers can repoint foreign keys before deleting rows.
#[must_use]
pub fn plan_bank_transition(
    old: Option<ExistingBankLink>,
    new: Option<BankLink>,
) -> Vec<BankStep> {
    match (old, new) {
        (None, None) => vec![],
        (None, Some(link)) => vec![BankStep::Create(link)],
        (Some(existing), None) => vec![BankStep::Remove {
            transaction_id: existing.transaction_id,
            link: existing.link,
        }],
        (Some(existing), Some(link)) if existing.link.account_id == link.account_id => {
            if existing.link.amount == link.amount {
                vec![]
            } else {
                vec![BankStep::Adjust {
                    transaction_id: existing.transaction_id,
                    account_id: link.account_id,
                    new_amount: link.amount,
                    delta: link.amount - existing.link.amount,
                }]
            }
        }
        (Some(existing), Some(link)) => vec![
            BankStep::Create(link),
            BankStep::Remove {
                transaction_id: existing.transaction_id,
                link: existing.link,
            },
        ],
    }
}

/// Balance change a step causes on its account, for a posting of `direction`.
#[must_use]
pub const fn balance_effect(step: &BankStep, direction: DebitCredit) -> i64 {
    match step {
        BankStep::Create(link) => direction.signed(link.amount),
        BankStep::Adjust { delta, .. } => direction.signed(*delta),
        BankStep::Remove { link, .. } => -direction.signed(link.amount),
    }
}

/// Checks that an account can absorb a balance change.
///
/// Only outgoing money is limited by the balance; reversing a credit may take
/// an account below zero.
pub fn ensure_covered(
    account_id: Uuid,
    balance: i64,
    effect: i64,
    disbursement: bool,
) -> Result<(), LedgerError> {
    if disbursement && effect < 0 && balance + effect < 0 {
        return Err(LedgerError::InsufficientBankBalance {
            account_id,
            balance,
            requested: -effect,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn existing(amount: i64) -> ExistingBankLink {
        ExistingBankLink {
            transaction_id: Uuid::from_u128(99),
            link: BankLink {
                account_id: account(1),
                amount,
            },
        }
    }

    #[test]
    fn test_none_to_none_touches_nothing() {
        assert!(plan_bank_transition(None, None).is_empty());
    }

    #[test]
    fn test_none_to_bank_creates() {
        let link = BankLink {
            account_id: account(1),
            amount: 5_000,
        };
        let steps = plan_bank_transition(None, Some(link));
        assert_eq!(steps, vec![BankStep::Create(link)]);
        assert_eq!(balance_effect(&steps[0], DebitCredit::Debit), -5_000);
    }

    #[test]
    fn test_bank_to_bank_adjusts_by_delta() {
        let steps = plan_bank_transition(
            Some(existing(5_000)),
            Some(BankLink {
                account_id: account(1),
                amount: 7_000,
            }),
        );
        assert!(matches!(steps[..], [BankStep::Adjust { delta: 2_000, .. }]));
        assert_eq!(balance_effect(&steps[0], DebitCredit::Debit), -2_000);
        assert_eq!(balance_effect(&steps[0], DebitCredit::Credit), 2_000);
    }

    #[test]
    fn test_bank_to_none_restores_balance() {
        let steps = plan_bank_transition(Some(existing(5_000)), None);
        assert!(matches!(steps[..], [BankStep::Remove { .. }]));
        assert_eq!(balance_effect(&steps[0], DebitCredit::Debit), 5_000);
    }

    #[test]
    fn test_account_change_creates_then_removes() {
        let steps = plan_bank_transition(
            Some(existing(5_000)),
            Some(BankLink {
                account_id: account(2),
                amount: 5_000,
            }),
        );
        assert!(matches!(
            steps[..],
            [BankStep::Create(_), BankStep::Remove { .. }]
        ));
    }

    #[test]
    fn test_same_amount_same_account_is_noop() {
        let steps = plan_bank_transition(
            Some(existing(5_000)),
            Some(BankLink {
                account_id: account(1),
                amount: 5_000,
            }),
        );
        assert!(steps.is_empty());
    }

    #[test]
    fn test_disbursement_coverage() {
        assert!(ensure_covered(account(1), 1_000, -1_000, true).is_ok());
        assert!(matches!(
            ensure_covered(account(1), 999, -1_000, true),
            Err(LedgerError::InsufficientBankBalance {
                requested: 1_000,
                ..
            })
        ));
        assert!(ensure_covered(account(1), 0, -1_000, false).is_ok());
    }
}
