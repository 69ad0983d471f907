//! Mutual funds: collections raised for a member (typically on death), with
//! one entry per contributing member.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use coop_core::filter::Value;
use coop_core::mutual_fund::{contribution_per_member, MutualFundComputationType};
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::{format_optional_timestamp, DbId, Timestamp};

use crate::error::DbError;
use crate::models::member_profile::{MemberProfile, MemberProfileResponse};
use crate::models::mutual_fund_entry::{MutualFundEntry, MutualFundEntryResponse};
use crate::preload::{belongs_to, has_many, split_path, unknown_relation};
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Dependent, OnDelete, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

/// A row from the `mutual_funds` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct MutualFund {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    /// The member the fund is raised for.
    pub member_profile_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub date_of_death: Option<Timestamp>,
    pub extension_only: bool,
    pub amount: f64,
    #[sqlx(try_from = "String")]
    pub computation_type: MutualFundComputationType,
    pub total_amount: f64,

    #[sqlx(skip)]
    pub member_profile: Option<Box<MemberProfile>>,
    #[sqlx(skip)]
    pub mutual_fund_entries: Vec<MutualFundEntry>,
}

impl MutualFund {
    /// What each of `contributors` members owes.
    pub fn contribution(&self, contributors: usize) -> Option<f64> {
        contribution_per_member(self.computation_type, self.amount, contributors)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutualFundResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub member_profile_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub date_of_death: Option<String>,
    pub extension_only: bool,
    pub amount: f64,
    pub computation_type: MutualFundComputationType,
    pub total_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_profile: Option<Box<MemberProfileResponse>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mutual_fund_entries: Vec<MutualFundEntryResponse>,
}

impl From<&MutualFund> for MutualFundResponse {
    fn from(fund: &MutualFund) -> Self {
        Self {
            audit: AuditResponse::from(&fund.audit),
            organization_id: fund.organization_id,
            branch_id: fund.branch_id,
            member_profile_id: fund.member_profile_id,
            name: fund.name.clone(),
            description: fund.description.clone(),
            date_of_death: format_optional_timestamp(fund.date_of_death.as_ref()),
            extension_only: fund.extension_only,
            amount: fund.amount,
            computation_type: fund.computation_type,
            total_amount: fund.total_amount,
            member_profile: fund
                .member_profile
                .as_deref()
                .map(MemberProfileResponse::from)
                .map(Box::new),
            mutual_fund_entries: fund
                .mutual_fund_entries
                .iter()
                .map(MutualFundEntryResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MutualFundRequest {
    pub member_profile_id: DbId,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub date_of_death: Option<Timestamp>,
    #[serde(default)]
    pub extension_only: bool,
    #[validate(range(min = 0.0))]
    pub amount: f64,
    #[serde(default)]
    pub computation_type: MutualFundComputationType,
}

impl EntityRequest<MutualFund> for MutualFundRequest {
    fn to_entity(&self, user: &UserContext) -> MutualFund {
        let mut fund = MutualFund {
            organization_id: user.organization_id,
            branch_id: user.branch_id,
            ..Default::default()
        };
        self.apply_to(&mut fund);
        fund
    }

    fn apply_to(&self, fund: &mut MutualFund) {
        fund.member_profile_id = self.member_profile_id;
        fund.name = self.name.clone();
        fund.description = self.description.clone();
        fund.date_of_death = self.date_of_death;
        fund.extension_only = self.extension_only;
        fund.amount = self.amount;
        fund.computation_type = self.computation_type;
    }
}

#[async_trait]
impl Record for MutualFund {
    const TABLE: &'static str = "mutual_funds";
    const KIND: &'static str = "mutual_fund";
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "branch_id",
        "member_profile_id",
        "name",
        "description",
        "date_of_death",
        "extension_only",
        "amount",
        "computation_type",
        "total_amount",
    ];

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("organization_id", self.organization_id.into()),
            ("branch_id", self.branch_id.into()),
            ("member_profile_id", self.member_profile_id.into()),
            ("name", self.name.clone().into()),
            ("description", self.description.clone().into()),
            ("date_of_death", self.date_of_death.into()),
            ("extension_only", self.extension_only.into()),
            ("amount", self.amount.into()),
            ("computation_type", self.computation_type.as_str().into()),
            ("total_amount", self.total_amount.into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        tenant_scopes(self.tenant())
    }

    fn dependents() -> Vec<Dependent> {
        vec![Dependent::of::<MutualFundEntry>("mutual_fund_id", OnDelete::Cascade)]
    }

    fn clear_relations(&mut self) {
        self.member_profile = None;
        self.mutual_fund_entries.clear();
    }

    async fn preload<S: Store>(store: &S, rows: &mut [Self], path: &str) -> Result<(), DbError> {
        match split_path(path) {
            ("member_profile", nested) => {
                belongs_to::<S, Self, MemberProfile>(
                    store,
                    rows,
                    nested,
                    |fund: &Self| Some(fund.member_profile_id),
                    |fund: &mut Self, member| fund.member_profile = member,
                )
                .await
            }
            ("mutual_fund_entries", nested) => {
                has_many::<S, Self, MutualFundEntry>(
                    store,
                    rows,
                    nested,
                    "mutual_fund_id",
                    |entry: &MutualFundEntry| Some(entry.mutual_fund_id),
                    |fund: &mut Self, entries| fund.mutual_fund_entries = entries,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl BranchScoped for MutualFund {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}
