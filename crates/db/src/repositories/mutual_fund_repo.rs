//! Repository for the `mutual_funds` table.

use coop_core::filter::FilterSql;
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::mutual_fund::{MutualFund, MutualFundRequest, MutualFundResponse};
use crate::record::Record;
use crate::registry::{Registry, RegistryParams};
use crate::repositories::mutual_fund_entry_repo::mutual_fund_entry_registry;
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type MutualFundRepo<S = PgStore> = Registry<MutualFund, MutualFundResponse, MutualFundRequest, S>;

pub fn mutual_fund_registry<S: Store>(store: S) -> MutualFundRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(
            vec!["member_profile", "mutual_fund_entries.member_profile"],
            |fund: &MutualFund| MutualFundResponse::from(fund),
        ),
    )
}

impl<S: Store> Registry<MutualFund, MutualFundResponse, MutualFundRequest, S> {
    /// Funds raised on behalf of one (deceased) member.
    pub async fn for_member(&self, member_profile_id: DbId) -> Result<Vec<MutualFund>, DbError> {
        self.find(vec![FilterSql::eq("member_profile_id", member_profile_id)])
            .await
    }

    /// Recompute `total_amount` from the live entries and persist it.
    pub async fn refresh_total(&self, actor: DbId, mutual_fund_id: DbId) -> Result<MutualFund, DbError> {
        let entries = mutual_fund_entry_registry(self.store().clone())
            .for_mutual_fund(mutual_fund_id)
            .await?;
        let mut fund = self.get_by_id(mutual_fund_id).await?;
        fund.total_amount = entries.iter().map(|entry| entry.amount).sum();
        fund.clear_relations();
        let fund = self.update(actor, fund).await?;
        tracing::debug!(
            mutual_fund_id = %mutual_fund_id,
            entries = entries.len(),
            total_amount = fund.total_amount,
            "Mutual fund total refreshed"
        );
        Ok(fund)
    }
}
