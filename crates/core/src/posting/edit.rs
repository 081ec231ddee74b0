//! Edit planning for journal rows that may carry a fee posting.

use uuid::Uuid;

/// Who a journal row's money is attributed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostingLink {
    /// Student whose fee the row pays into.
    pub student_id: Option<Uuid>,
    /// Director the row is booked against, where that changes attribution.
    pub director_id: Option<Uuid>,
}

/// How an edit moves the fee side of a journal row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPlan {
    /// Neither version touches a fee.
    NoFeeEffect,
    /// Same student before and after; apply `old - new` as one adjustment.
    Adjust {
        /// The student whose fee moves.
        student_id: Uuid,
    },
    /// Attribution changed; reverse the old posting fully, then post the new one.
    Reattribute {
        /// Student whose posting is reversed, if any.
        from: Option<Uuid>,
        /// Student who receives the new posting, if any.
        to: Option<Uuid>,
    },
}

impl EditPlan {
    /// Decides how an edit reaches the fee ledger.
    ///
    /// `has_payment` says whether the old row actually produced a payment. A
    /// row that should have one but does not is treated as a re-attribution so
    /// the new posting is applied from scratch.
    #[must_use]
    pub fn decide(old: PostingLink, new: PostingLink, has_payment: bool) -> Self {
        match (old.student_id, new.student_id) {
            (None, None) => Self::NoFeeEffect,
            (Some(before), Some(after))
                if before == after && old.director_id == new.director_id && has_payment =>
            {
                Self::Adjust { student_id: after }
            }
            (from, to) => Self::Reattribute {
                from: from.filter(|_| has_payment),
                to,
            },
        }
    }
}
