//! Loan transaction lifecycle.
//!
//! A loan moves strictly forward through `draft -> printed -> approved ->
//! released`. The state is stored explicitly; the `printed_date`,
//! `approved_date` and `released_date` columns record when each transition
//! happened and never drive the state on their own.

use crate::error::CoreError;
use crate::types::Timestamp;

define_text_enum! {
    /// Where a loan transaction is in its release workflow.
    LoanTransactionState {
        Draft = "draft",
        Printed = "printed",
        Approved = "approved",
        Released = "released",
    }
}

impl Default for LoanTransactionState {
    fn default() -> Self {
        LoanTransactionState::Draft
    }
}

impl LoanTransactionState {
    /// The only state reachable from `self`, or `None` once released.
    pub fn next(self) -> Option<Self> {
        match self {
            LoanTransactionState::Draft => Some(LoanTransactionState::Printed),
            LoanTransactionState::Printed => Some(LoanTransactionState::Approved),
            LoanTransactionState::Approved => Some(LoanTransactionState::Released),
            LoanTransactionState::Released => None,
        }
    }

    /// Validate a transition to `to`. Only single forward steps are allowed.
    pub fn advance(self, to: Self) -> Result<Self, CoreError> {
        if self.next() == Some(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidTransition {
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }

    /// Which of `(printed, approved, released)` timestamps a row in this
    /// state carries.
    pub fn stamped(self) -> (bool, bool, bool) {
        match self {
            LoanTransactionState::Draft => (false, false, false),
            LoanTransactionState::Printed => (true, false, false),
            LoanTransactionState::Approved => (true, true, false),
            LoanTransactionState::Released => (true, true, true),
        }
    }

    /// Derive the state of a row from its transition timestamps.
    ///
    /// Used when importing rows that predate the `state` column. Lattice
    /// points outside the forward chain (e.g. released but never approved)
    /// are rejected.
    pub fn from_timestamps(
        printed: Option<&Timestamp>,
        approved: Option<&Timestamp>,
        released: Option<&Timestamp>,
    ) -> Result<Self, CoreError> {
        let stamped = (printed.is_some(), approved.is_some(), released.is_some());
        LoanTransactionState::ALL
            .iter()
            .copied()
            .find(|state| state.stamped() == stamped)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Inconsistent loan timestamps (printed={}, approved={}, released={})",
                    stamped.0, stamped.1, stamped.2
                ))
            })
    }
}
