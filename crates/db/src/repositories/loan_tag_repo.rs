//! Repository for the `loan_tags` table.

use coop_core::filter::{FilterSql, SortSpec};
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::loan_tag::{LoanTag, LoanTagRequest, LoanTagResponse};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type LoanTagRepo<S = PgStore> = Registry<LoanTag, LoanTagResponse, LoanTagRequest, S>;

pub fn loan_tag_registry<S: Store>(store: S) -> LoanTagRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(Vec::new(), |tag: &LoanTag| LoanTagResponse::from(tag)),
    )
}

impl<S: Store> Registry<LoanTag, LoanTagResponse, LoanTagRequest, S> {
    pub async fn for_loan_transaction(&self, loan_transaction_id: DbId) -> Result<Vec<LoanTag>, DbError> {
        self.arr_find(
            vec![FilterSql::eq("loan_transaction_id", loan_transaction_id)],
            vec![SortSpec::asc("created_at")],
        )
        .await
    }
}
