//! Repository for the `loan_statuses` table.

use crate::models::loan_status::{LoanStatus, LoanStatusRequest, LoanStatusResponse};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type LoanStatusRepo<S = PgStore> = Registry<LoanStatus, LoanStatusResponse, LoanStatusRequest, S>;

pub fn loan_status_registry<S: Store>(store: S) -> LoanStatusRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(Vec::new(), |status: &LoanStatus| {
            LoanStatusResponse::from(status)
        }),
    )
}
