//! Repository for the `loan_purposes` table.

use crate::models::loan_purpose::{LoanPurpose, LoanPurposeRequest, LoanPurposeResponse};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type LoanPurposeRepo<S = PgStore> =
    Registry<LoanPurpose, LoanPurposeResponse, LoanPurposeRequest, S>;

pub fn loan_purpose_registry<S: Store>(store: S) -> LoanPurposeRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(Vec::new(), |purpose: &LoanPurpose| {
            LoanPurposeResponse::from(purpose)
        }),
    )
}
