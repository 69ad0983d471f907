//! One member's contribution to a mutual fund.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use coop_core::filter::Value;
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::account::{Account, AccountResponse};
use crate::models::member_profile::{MemberProfile, MemberProfileResponse};
use crate::models::mutual_fund::MutualFund;
use crate::preload::{belongs_to, split_path, unknown_relation};
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

/// Topic axis of the owning fund.
pub const SCOPE_MUTUAL_FUND: &str = "mutual_fund";

/// A row from the `mutual_fund_entries` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct MutualFundEntry {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub mutual_fund_id: DbId,
    pub member_profile_id: DbId,
    pub account_id: Option<DbId>,
    pub amount: f64,

    #[sqlx(skip)]
    pub mutual_fund: Option<Box<MutualFund>>,
    #[sqlx(skip)]
    pub member_profile: Option<Box<MemberProfile>>,
    #[sqlx(skip)]
    pub account: Option<Box<Account>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutualFundEntryResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub mutual_fund_id: DbId,
    pub member_profile_id: DbId,
    pub account_id: Option<DbId>,
    pub amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_profile: Option<Box<MemberProfileResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Box<AccountResponse>>,
}

impl From<&MutualFundEntry> for MutualFundEntryResponse {
    fn from(entry: &MutualFundEntry) -> Self {
        Self {
            audit: AuditResponse::from(&entry.audit),
            organization_id: entry.organization_id,
            branch_id: entry.branch_id,
            mutual_fund_id: entry.mutual_fund_id,
            member_profile_id: entry.member_profile_id,
            account_id: entry.account_id,
            amount: entry.amount,
            member_profile: entry
                .member_profile
                .as_deref()
                .map(MemberProfileResponse::from)
                .map(Box::new),
            account: entry.account.as_deref().map(AccountResponse::from).map(Box::new),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MutualFundEntryRequest {
    pub mutual_fund_id: DbId,
    pub member_profile_id: DbId,
    pub account_id: Option<DbId>,
    #[validate(range(min = 0.0))]
    pub amount: f64,
}

impl EntityRequest<MutualFundEntry> for MutualFundEntryRequest {
    fn to_entity(&self, user: &UserContext) -> MutualFundEntry {
        let mut entry = MutualFundEntry {
            organization_id: user.organization_id,
            branch_id: user.branch_id,
            ..Default::default()
        };
        self.apply_to(&mut entry);
        entry
    }

    fn apply_to(&self, entry: &mut MutualFundEntry) {
        entry.mutual_fund_id = self.mutual_fund_id;
        entry.member_profile_id = self.member_profile_id;
        entry.account_id = self.account_id;
        entry.amount = self.amount;
    }
}

#[async_trait]
impl Record for MutualFundEntry {
    const TABLE: &'static str = "mutual_fund_entries";
    const KIND: &'static str = "mutual_fund_entry";
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "branch_id",
        "mutual_fund_id",
        "member_profile_id",
        "account_id",
        "amount",
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
            ("mutual_fund_id", self.mutual_fund_id.into()),
            ("member_profile_id", self.member_profile_id.into()),
            ("account_id", self.account_id.into()),
            ("amount", self.amount.into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        let mut scopes = tenant_scopes(self.tenant());
        scopes.push((SCOPE_MUTUAL_FUND, self.mutual_fund_id));
        scopes
    }

    fn clear_reference(&mut self, column: &str) {
        if column == "account_id" {
            self.account_id = None;
        }
    }

    fn clear_relations(&mut self) {
        self.mutual_fund = None;
        self.member_profile = None;
        self.account = None;
    }

    async fn preload<S: Store>(store: &S, rows: &mut [Self], path: &str) -> Result<(), DbError> {
        match split_path(path) {
            ("mutual_fund", nested) => {
                belongs_to::<S, Self, MutualFund>(
                    store,
                    rows,
                    nested,
                    |entry: &Self| Some(entry.mutual_fund_id),
                    |entry: &mut Self, fund| entry.mutual_fund = fund,
                )
                .await
            }
            ("member_profile", nested) => {
                belongs_to::<S, Self, MemberProfile>(
                    store,
                    rows,
                    nested,
                    |entry: &Self| Some(entry.member_profile_id),
                    |entry: &mut Self, member| entry.member_profile = member,
                )
                .await
            }
            ("account", nested) => {
                belongs_to::<S, Self, Account>(
                    store,
                    rows,
                    nested,
                    |entry: &Self| entry.account_id,
                    |entry: &mut Self, account| entry.account = account,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl BranchScoped for MutualFundEntry {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}
