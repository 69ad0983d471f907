//! Browse references: per-account interest and balance rules, optionally
//! narrowed to one member type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use coop_core::filter::Value;
use coop_core::interest::InterestType;
use coop_core::ranges::select_bracket;
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::account::{Account, AccountResponse};
use crate::models::interest_rate_by_amount::{InterestRateByAmount, InterestRateByAmountResponse};
use crate::models::member_type::{MemberType, MemberTypeResponse};
use crate::preload::{belongs_to, has_many, split_path, unknown_relation};
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Dependent, OnDelete, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

/// A row from the `browse_references` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct BrowseReference {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub account_id: DbId,
    pub member_type_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub interest_type: InterestType,
    /// Flat rate used unless `interest_type` is `amount`.
    pub interest_rate: f64,
    pub minimum_balance: f64,
    pub charges: f64,

    #[sqlx(skip)]
    pub account: Option<Box<Account>>,
    #[sqlx(skip)]
    pub member_type: Option<Box<MemberType>>,
    #[sqlx(skip)]
    pub interest_rates_by_amount: Vec<InterestRateByAmount>,
}

impl BrowseReference {
    /// Rate applied to `amount`: the flat rate, or the matching preloaded
    /// bracket when the reference prices by amount.
    pub fn effective_rate(&self, amount: f64) -> Option<f64> {
        if !self.interest_type.uses_amount_brackets() {
            return Some(self.interest_rate);
        }
        select_bracket(&self.interest_rates_by_amount, amount, |row| {
            (row.from_amount, row.to_amount)
        })
        .map(|row| row.interest_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowseReferenceResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub account_id: DbId,
    pub member_type_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    pub interest_type: InterestType,
    pub interest_rate: f64,
    pub minimum_balance: f64,
    pub charges: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<Box<AccountResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_type: Option<Box<MemberTypeResponse>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub interest_rates_by_amount: Vec<InterestRateByAmountResponse>,
}

impl From<&BrowseReference> for BrowseReferenceResponse {
    fn from(reference: &BrowseReference) -> Self {
        Self {
            audit: AuditResponse::from(&reference.audit),
            organization_id: reference.organization_id,
            branch_id: reference.branch_id,
            account_id: reference.account_id,
            member_type_id: reference.member_type_id,
            name: reference.name.clone(),
            description: reference.description.clone(),
            interest_type: reference.interest_type,
            interest_rate: reference.interest_rate,
            minimum_balance: reference.minimum_balance,
            charges: reference.charges,
            account: reference
                .account
                .as_deref()
                .map(AccountResponse::from)
                .map(Box::new),
            member_type: reference
                .member_type
                .as_deref()
                .map(MemberTypeResponse::from)
                .map(Box::new),
            interest_rates_by_amount: reference
                .interest_rates_by_amount
                .iter()
                .map(InterestRateByAmountResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BrowseReferenceRequest {
    pub account_id: DbId,
    pub member_type_id: Option<DbId>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    pub interest_type: InterestType,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default)]
    pub interest_rate: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub minimum_balance: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub charges: f64,
}

impl EntityRequest<BrowseReference> for BrowseReferenceRequest {
    fn to_entity(&self, user: &UserContext) -> BrowseReference {
        let mut reference = BrowseReference {
            organization_id: user.organization_id,
            branch_id: user.branch_id,
            ..Default::default()
        };
        self.apply_to(&mut reference);
        reference
    }

    fn apply_to(&self, reference: &mut BrowseReference) {
        reference.account_id = self.account_id;
        reference.member_type_id = self.member_type_id;
        reference.name = self.name.clone();
        reference.description = self.description.clone();
        reference.interest_type = self.interest_type;
        reference.interest_rate = self.interest_rate;
        reference.minimum_balance = self.minimum_balance;
        reference.charges = self.charges;
    }
}

#[async_trait]
impl Record for BrowseReference {
    const TABLE: &'static str = "browse_references";
    const KIND: &'static str = "browse_reference";
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "branch_id",
        "account_id",
        "member_type_id",
        "name",
        "description",
        "interest_type",
        "interest_rate",
        "minimum_balance",
        "charges",
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
            ("account_id", self.account_id.into()),
            ("member_type_id", self.member_type_id.into()),
            ("name", self.name.clone().into()),
            ("description", self.description.clone().into()),
            ("interest_type", self.interest_type.as_str().into()),
            ("interest_rate", self.interest_rate.into()),
            ("minimum_balance", self.minimum_balance.into()),
            ("charges", self.charges.into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        tenant_scopes(self.tenant())
    }

    fn dependents() -> Vec<Dependent> {
        vec![Dependent::of::<InterestRateByAmount>(
            "browse_reference_id",
            OnDelete::Cascade,
        )]
    }

    fn clear_reference(&mut self, column: &str) {
        if column == "member_type_id" {
            self.member_type_id = None;
        }
    }

    fn clear_relations(&mut self) {
        self.account = None;
        self.member_type = None;
        self.interest_rates_by_amount.clear();
    }

    async fn preload<S: Store>(store: &S, rows: &mut [Self], path: &str) -> Result<(), DbError> {
        match split_path(path) {
            ("account", nested) => {
                belongs_to::<S, Self, Account>(
                    store,
                    rows,
                    nested,
                    |reference: &Self| Some(reference.account_id),
                    |reference: &mut Self, account| reference.account = account,
                )
                .await
            }
            ("member_type", nested) => {
                belongs_to::<S, Self, MemberType>(
                    store,
                    rows,
                    nested,
                    |reference: &Self| reference.member_type_id,
                    |reference: &mut Self, member_type| reference.member_type = member_type,
                )
                .await
            }
            ("interest_rates_by_amount", nested) => {
                has_many::<S, Self, InterestRateByAmount>(
                    store,
                    rows,
                    nested,
                    "browse_reference_id",
                    |rate: &InterestRateByAmount| Some(rate.browse_reference_id),
                    |reference: &mut Self, rates| reference.interest_rates_by_amount = rates,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl BranchScoped for BrowseReference {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}
