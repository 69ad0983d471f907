//! Repository for the `browse_references` table.

use coop_core::filter::{FilterSql, Query, SortSpec};
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::browse_reference::{
    BrowseReference, BrowseReferenceRequest, BrowseReferenceResponse,
};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type BrowseReferenceRepo<S = PgStore> =
    Registry<BrowseReference, BrowseReferenceResponse, BrowseReferenceRequest, S>;

pub fn browse_reference_registry<S: Store>(store: S) -> BrowseReferenceRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(
            vec!["account", "member_type", "interest_rates_by_amount"],
            |reference: &BrowseReference| BrowseReferenceResponse::from(reference),
        ),
    )
}

impl<S: Store> Registry<BrowseReference, BrowseReferenceResponse, BrowseReferenceRequest, S> {
    pub async fn for_account(&self, account_id: DbId) -> Result<Vec<BrowseReference>, DbError> {
        self.arr_find(
            vec![FilterSql::eq("account_id", account_id)],
            vec![SortSpec::asc("name")],
        )
        .await
    }

    /// The reference that applies to a member type on an account. Falls back
    /// to the account's catch-all reference (no member type) when the member
    /// type has none of its own.
    pub async fn applicable(
        &self,
        account_id: DbId,
        member_type_id: Option<DbId>,
    ) -> Result<Option<BrowseReference>, DbError> {
        if let Some(member_type_id) = member_type_id {
            let specific = self
                .find_first(
                    Query::new()
                        .filter(FilterSql::eq("account_id", account_id))
                        .filter(FilterSql::eq("member_type_id", member_type_id))
                        .sort(SortSpec::desc("created_at")),
                )
                .await?;
            if specific.is_some() {
                return Ok(specific);
            }
        }
        self.find_first(
            Query::new()
                .filter(FilterSql::eq("account_id", account_id))
                .filter(FilterSql::is_null("member_type_id"))
                .sort(SortSpec::desc("created_at")),
        )
        .await
    }
}
