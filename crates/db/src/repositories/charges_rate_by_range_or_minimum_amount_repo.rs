//! Repository for the `charges_rate_by_range_or_minimum_amounts` table.

use coop_core::filter::{FilterSql, Query, SortSpec};
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::charges_rate_by_range_or_minimum_amount::{
    ChargesRateByRangeOrMinimumAmount, ChargesRateByRangeOrMinimumAmountRequest,
    ChargesRateByRangeOrMinimumAmountResponse,
};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type ChargesRateByRangeOrMinimumAmountRepo<S = PgStore> = Registry<
    ChargesRateByRangeOrMinimumAmount,
    ChargesRateByRangeOrMinimumAmountResponse,
    ChargesRateByRangeOrMinimumAmountRequest,
    S,
>;

pub fn charges_rate_by_range_or_minimum_amount_registry<S: Store>(
    store: S,
) -> ChargesRateByRangeOrMinimumAmountRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(Vec::new(), |range: &ChargesRateByRangeOrMinimumAmount| {
            ChargesRateByRangeOrMinimumAmountResponse::from(range)
        }),
    )
}

impl<S: Store>
    Registry<
        ChargesRateByRangeOrMinimumAmount,
        ChargesRateByRangeOrMinimumAmountResponse,
        ChargesRateByRangeOrMinimumAmountRequest,
        S,
    >
{
    /// Brackets of one scheme, lowest first.
    pub async fn for_scheme(
        &self,
        charges_rate_scheme_id: DbId,
    ) -> Result<Vec<ChargesRateByRangeOrMinimumAmount>, DbError> {
        self.arr_find(
            vec![FilterSql::eq("charges_rate_scheme_id", charges_rate_scheme_id)],
            vec![SortSpec::asc("from_amount")],
        )
        .await
    }

    /// The bracket containing `amount` (bounds inclusive), lowest bracket
    /// first.
    pub async fn charge_for_amount(
        &self,
        charges_rate_scheme_id: DbId,
        amount: f64,
    ) -> Result<Option<ChargesRateByRangeOrMinimumAmount>, DbError> {
        self.find_first(
            Query::new()
                .filter(FilterSql::eq("charges_rate_scheme_id", charges_rate_scheme_id))
                .filter(FilterSql::lte("from_amount", amount))
                .filter(FilterSql::gte("to_amount", amount))
                .sort(SortSpec::asc("from_amount")),
        )
        .await
    }

    /// The charge a loan of `loan_amount` incurs under the scheme, if any
    /// bracket covers it.
    pub async fn charge_for_loan(
        &self,
        charges_rate_scheme_id: DbId,
        loan_amount: f64,
    ) -> Result<Option<f64>, DbError> {
        Ok(self
            .charge_for_amount(charges_rate_scheme_id, loan_amount)
            .await?
            .map(|range| range.compute(loan_amount)))
    }
}
