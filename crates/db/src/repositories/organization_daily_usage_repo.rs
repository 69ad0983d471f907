//! Repository for the `organization_daily_usages` table.

use coop_core::filter::{FilterSql, SortSpec};
use coop_core::types::{DbId, Timestamp};

use crate::error::DbError;
use crate::models::organization_daily_usage::{
    OrganizationDailyUsage, OrganizationDailyUsageRequest, OrganizationDailyUsageResponse,
};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type OrganizationDailyUsageRepo<S = PgStore> = Registry<
    OrganizationDailyUsage,
    OrganizationDailyUsageResponse,
    OrganizationDailyUsageRequest,
    S,
>;

pub fn organization_daily_usage_registry<S: Store>(store: S) -> OrganizationDailyUsageRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(Vec::new(), |usage: &OrganizationDailyUsage| {
            OrganizationDailyUsageResponse::from(usage)
        }),
    )
}

impl<S: Store>
    Registry<OrganizationDailyUsage, OrganizationDailyUsageResponse, OrganizationDailyUsageRequest, S>
{
    /// Usage rows of one organization with `from <= usage_date <= to`,
    /// oldest first.
    pub async fn for_range(
        &self,
        organization_id: DbId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<OrganizationDailyUsage>, DbError> {
        self.arr_find(
            vec![
                FilterSql::eq("organization_id", organization_id),
                FilterSql::gte("usage_date", from),
                FilterSql::lte("usage_date", to),
            ],
            vec![SortSpec::asc("usage_date")],
        )
        .await
    }
}
