//! Daily usage counters per organization, used for billing and dashboards.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use coop_core::filter::Value;
use coop_core::tenant::UserContext;
use coop_core::topics::SCOPE_ORGANIZATION;
use coop_core::types::{format_timestamp, DbId, Timestamp};

use crate::error::DbError;
use crate::models::organization::{Organization, OrganizationResponse};
use crate::preload::{belongs_to, split_path, unknown_relation};
use crate::record::{Audit, AuditResponse, OrganizationScoped, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

/// A row from the `organization_daily_usages` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct OrganizationDailyUsage {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    /// The day the counters cover, at UTC midnight.
    pub usage_date: Timestamp,
    pub total_members: i64,
    pub total_branches: i64,
    pub total_employees: i64,
    pub total_transactions: i64,
    pub total_transaction_amount: f64,

    #[sqlx(skip)]
    pub organization: Option<Box<Organization>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationDailyUsageResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub usage_date: String,
    pub total_members: i64,
    pub total_branches: i64,
    pub total_employees: i64,
    pub total_transactions: i64,
    pub total_transaction_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Box<OrganizationResponse>>,
}

impl From<&OrganizationDailyUsage> for OrganizationDailyUsageResponse {
    fn from(usage: &OrganizationDailyUsage) -> Self {
        Self {
            audit: AuditResponse::from(&usage.audit),
            organization_id: usage.organization_id,
            usage_date: format_timestamp(&usage.usage_date),
            total_members: usage.total_members,
            total_branches: usage.total_branches,
            total_employees: usage.total_employees,
            total_transactions: usage.total_transactions,
            total_transaction_amount: usage.total_transaction_amount,
            organization: usage
                .organization
                .as_deref()
                .map(OrganizationResponse::from)
                .map(Box::new),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrganizationDailyUsageRequest {
    pub usage_date: Timestamp,
    #[validate(range(min = 0))]
    pub total_members: i64,
    #[validate(range(min = 0))]
    pub total_branches: i64,
    #[validate(range(min = 0))]
    pub total_employees: i64,
    #[validate(range(min = 0))]
    pub total_transactions: i64,
    #[validate(range(min = 0.0))]
    pub total_transaction_amount: f64,
}

impl EntityRequest<OrganizationDailyUsage> for OrganizationDailyUsageRequest {
    fn to_entity(&self, user: &UserContext) -> OrganizationDailyUsage {
        let mut usage = OrganizationDailyUsage {
            organization_id: user.organization_id,
            ..Default::default()
        };
        self.apply_to(&mut usage);
        usage
    }

    fn apply_to(&self, usage: &mut OrganizationDailyUsage) {
        usage.usage_date = self.usage_date;
        usage.total_members = self.total_members;
        usage.total_branches = self.total_branches;
        usage.total_employees = self.total_employees;
        usage.total_transactions = self.total_transactions;
        usage.total_transaction_amount = self.total_transaction_amount;
    }
}

#[async_trait]
impl Record for OrganizationDailyUsage {
    const TABLE: &'static str = "organization_daily_usages";
    const KIND: &'static str = "organization_daily_usage";
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "usage_date",
        "total_members",
        "total_branches",
        "total_employees",
        "total_transactions",
        "total_transaction_amount",
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
            ("usage_date", self.usage_date.into()),
            ("total_members", self.total_members.into()),
            ("total_branches", self.total_branches.into()),
            ("total_employees", self.total_employees.into()),
            ("total_transactions", self.total_transactions.into()),
            ("total_transaction_amount", self.total_transaction_amount.into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        vec![(SCOPE_ORGANIZATION, self.organization_id)]
    }

    fn clear_relations(&mut self) {
        self.organization = None;
    }

    async fn preload<S: Store>(store: &S, rows: &mut [Self], path: &str) -> Result<(), DbError> {
        match split_path(path) {
            ("organization", nested) => {
                belongs_to::<S, Self, Organization>(
                    store,
                    rows,
                    nested,
                    |usage: &Self| Some(usage.organization_id),
                    |usage: &mut Self, org| usage.organization = org,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl OrganizationScoped for OrganizationDailyUsage {
    fn organization_id(&self) -> DbId {
        self.organization_id
    }
}
