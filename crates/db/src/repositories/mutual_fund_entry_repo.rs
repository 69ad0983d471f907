//! Repository for the `mutual_fund_entries` table.

use coop_core::filter::{FilterSql, SortSpec};
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::mutual_fund_entry::{
    MutualFundEntry, MutualFundEntryRequest, MutualFundEntryResponse,
};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type MutualFundEntryRepo<S = PgStore> =
    Registry<MutualFundEntry, MutualFundEntryResponse, MutualFundEntryRequest, S>;

pub fn mutual_fund_entry_registry<S: Store>(store: S) -> MutualFundEntryRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(vec!["member_profile", "account"], |entry: &MutualFundEntry| {
            MutualFundEntryResponse::from(entry)
        }),
    )
}

impl<S: Store> Registry<MutualFundEntry, MutualFundEntryResponse, MutualFundEntryRequest, S> {
    pub async fn for_mutual_fund(&self, mutual_fund_id: DbId) -> Result<Vec<MutualFundEntry>, DbError> {
        self.arr_find(
            vec![FilterSql::eq("mutual_fund_id", mutual_fund_id)],
            vec![SortSpec::asc("created_at")],
        )
        .await
    }

    /// Every contribution a member has made, newest first.
    pub async fn for_member(&self, member_profile_id: DbId) -> Result<Vec<MutualFundEntry>, DbError> {
        self.find(vec![FilterSql::eq("member_profile_id", member_profile_id)])
            .await
    }
}
