//! Repository layer.
//!
//! Each repository is a [`Registry`] instantiation: a type alias, a
//! constructor wiring its preloads and projection, and inherent helpers for
//! the lookups that entity needs beyond generic CRUD.

use coop_core::types::DbId;

use crate::error::DbError;
use crate::record::Record;
use crate::registry::{EntityRequest, Registry};
use crate::store::Store;

pub mod account_repo;
pub mod branch_repo;
pub mod browse_reference_repo;
pub mod charges_rate_by_range_or_minimum_amount_repo;
pub mod charges_rate_scheme_repo;
pub mod interest_rate_by_amount_repo;
pub mod loan_purpose_repo;
pub mod loan_status_repo;
pub mod loan_tag_repo;
pub mod loan_transaction_repo;
pub mod member_profile_repo;
pub mod member_type_repo;
pub mod mutual_fund_entry_repo;
pub mod mutual_fund_repo;
pub mod organization_daily_usage_repo;
pub mod organization_repo;

pub use account_repo::{account_registry, AccountRepo};
pub use branch_repo::{branch_registry, BranchRepo};
pub use browse_reference_repo::{browse_reference_registry, BrowseReferenceRepo};
pub use charges_rate_by_range_or_minimum_amount_repo::{
    charges_rate_by_range_or_minimum_amount_registry, ChargesRateByRangeOrMinimumAmountRepo,
};
pub use charges_rate_scheme_repo::{charges_rate_scheme_registry, ChargesRateSchemeRepo};
pub use interest_rate_by_amount_repo::{interest_rate_by_amount_registry, InterestRateByAmountRepo};
pub use loan_purpose_repo::{loan_purpose_registry, LoanPurposeRepo};
pub use loan_status_repo::{loan_status_registry, LoanStatusRepo};
pub use loan_tag_repo::{loan_tag_registry, LoanTagRepo};
pub use loan_transaction_repo::{loan_transaction_registry, LoanTransactionRepo};
pub use member_profile_repo::{member_profile_registry, MemberProfileRepo};
pub use member_type_repo::{member_type_registry, MemberTypeRepo};
pub use mutual_fund_entry_repo::{mutual_fund_entry_registry, MutualFundEntryRepo};
pub use mutual_fund_repo::{mutual_fund_registry, MutualFundRepo};
pub use organization_daily_usage_repo::{organization_daily_usage_registry, OrganizationDailyUsageRepo};
pub use organization_repo::{organization_registry, OrganizationRepo};

/// Upsert `children` and soft-delete `deleted` inside the parent's
/// transaction.
///
/// Child ids in either list must belong to the parent (`existing`); an id
/// outside it is reported as not found rather than touching another
/// parent's row.
pub(crate) async fn sync_children<C, R, Q, S>(
    registry: &Registry<C, R, Q, S>,
    tx: &mut S::Tx,
    actor: DbId,
    existing: &[DbId],
    children: Vec<C>,
    deleted: &[DbId],
) -> Result<(), DbError>
where
    C: Record,
    R: serde::Serialize,
    Q: EntityRequest<C>,
    S: Store,
{
    let foreign = children
        .iter()
        .map(Record::id)
        .filter(|id| !id.is_nil())
        .chain(deleted.iter().copied())
        .find(|id| !existing.contains(id));
    if let Some(id) = foreign {
        return Err(DbError::NotFound { entity: C::KIND, id });
    }

    for child in children {
        registry.upsert_with_tx(tx, actor, child).await?;
    }
    for id in deleted {
        registry.delete_with_tx(tx, actor, *id).await?;
    }
    Ok(())
}
