//! Repository for the `interest_rate_by_amounts` table.

use coop_core::filter::{FilterSql, Query, SortSpec};
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::interest_rate_by_amount::{
    InterestRateByAmount, InterestRateByAmountRequest, InterestRateByAmountResponse,
};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type InterestRateByAmountRepo<S = PgStore> =
    Registry<InterestRateByAmount, InterestRateByAmountResponse, InterestRateByAmountRequest, S>;

pub fn interest_rate_by_amount_registry<S: Store>(store: S) -> InterestRateByAmountRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(Vec::new(), |rate: &InterestRateByAmount| {
            InterestRateByAmountResponse::from(rate)
        }),
    )
}

impl<S: Store>
    Registry<InterestRateByAmount, InterestRateByAmountResponse, InterestRateByAmountRequest, S>
{
    /// The bracket with `from_amount <= amount <= to_amount`. `None` when no
    /// bracket covers the amount.
    pub async fn interest_rate_for_amount(
        &self,
        browse_reference_id: DbId,
        amount: f64,
    ) -> Result<Option<InterestRateByAmount>, DbError> {
        self.find_first(
            Query::new()
                .filter(FilterSql::eq("browse_reference_id", browse_reference_id))
                .filter(FilterSql::lte("from_amount", amount))
                .filter(FilterSql::gte("to_amount", amount))
                .sort(SortSpec::asc("from_amount")),
        )
        .await
    }

    pub async fn for_browse_reference(
        &self,
        browse_reference_id: DbId,
    ) -> Result<Vec<InterestRateByAmount>, DbError> {
        self.arr_find(
            vec![FilterSql::eq("browse_reference_id", browse_reference_id)],
            vec![SortSpec::asc("from_amount")],
        )
        .await
    }

    /// Brackets overlapping `from..=to`.
    pub async fn for_range(
        &self,
        browse_reference_id: DbId,
        from: f64,
        to: f64,
    ) -> Result<Vec<InterestRateByAmount>, DbError> {
        self.arr_find(
            vec![
                FilterSql::eq("browse_reference_id", browse_reference_id),
                FilterSql::lte("from_amount", to),
                FilterSql::gte("to_amount", from),
            ],
            vec![SortSpec::asc("from_amount")],
        )
        .await
    }
}
