//! Interest brackets of a browse reference, keyed by amount.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use coop_core::filter::Value;
use coop_core::ranges::{bracket_contains, validate_amount_range};
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::DbId;
use coop_core::validation::schema_error;

use crate::error::DbError;
use crate::models::browse_reference::{BrowseReference, BrowseReferenceResponse};
use crate::preload::{belongs_to, split_path, unknown_relation};
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

/// Topic axis of the owning browse reference.
pub const SCOPE_BROWSE_REFERENCE: &str = "browse_reference";

/// A row from the `interest_rate_by_amounts` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct InterestRateByAmount {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub browse_reference_id: DbId,
    pub from_amount: f64,
    pub to_amount: f64,
    /// Percent.
    pub interest_rate: f64,

    #[sqlx(skip)]
    pub browse_reference: Option<Box<BrowseReference>>,
}

impl InterestRateByAmount {
    pub fn contains(&self, amount: f64) -> bool {
        bracket_contains(self.from_amount, self.to_amount, amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterestRateByAmountResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub browse_reference_id: DbId,
    pub from_amount: f64,
    pub to_amount: f64,
    pub interest_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browse_reference: Option<Box<BrowseReferenceResponse>>,
}

impl From<&InterestRateByAmount> for InterestRateByAmountResponse {
    fn from(rate: &InterestRateByAmount) -> Self {
        Self {
            audit: AuditResponse::from(&rate.audit),
            organization_id: rate.organization_id,
            branch_id: rate.branch_id,
            browse_reference_id: rate.browse_reference_id,
            from_amount: rate.from_amount,
            to_amount: rate.to_amount,
            interest_rate: rate.interest_rate,
            browse_reference: rate
                .browse_reference
                .as_deref()
                .map(BrowseReferenceResponse::from)
                .map(Box::new),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_interest_bracket"))]
pub struct InterestRateByAmountRequest {
    pub browse_reference_id: DbId,
    pub from_amount: f64,
    pub to_amount: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub interest_rate: f64,
}

fn validate_interest_bracket(request: &InterestRateByAmountRequest) -> Result<(), ValidationError> {
    schema_error(
        "amount_range",
        validate_amount_range(request.from_amount, request.to_amount, "Interest bracket"),
    )
}

impl EntityRequest<InterestRateByAmount> for InterestRateByAmountRequest {
    fn to_entity(&self, user: &UserContext) -> InterestRateByAmount {
        let mut rate = InterestRateByAmount {
            organization_id: user.organization_id,
            branch_id: user.branch_id,
            ..Default::default()
        };
        self.apply_to(&mut rate);
        rate
    }

    fn apply_to(&self, rate: &mut InterestRateByAmount) {
        rate.browse_reference_id = self.browse_reference_id;
        rate.from_amount = self.from_amount;
        rate.to_amount = self.to_amount;
        rate.interest_rate = self.interest_rate;
    }
}

#[async_trait]
impl Record for InterestRateByAmount {
    const TABLE: &'static str = "interest_rate_by_amounts";
    const KIND: &'static str = "interest_rate_by_amount";
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "branch_id",
        "browse_reference_id",
        "from_amount",
        "to_amount",
        "interest_rate",
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
            ("browse_reference_id", self.browse_reference_id.into()),
            ("from_amount", self.from_amount.into()),
            ("to_amount", self.to_amount.into()),
            ("interest_rate", self.interest_rate.into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        let mut scopes = tenant_scopes(self.tenant());
        scopes.push((SCOPE_BROWSE_REFERENCE, self.browse_reference_id));
        scopes
    }

    fn clear_relations(&mut self) {
        self.browse_reference = None;
    }

    async fn preload<S: Store>(store: &S, rows: &mut [Self], path: &str) -> Result<(), DbError> {
        match split_path(path) {
            ("browse_reference", nested) => {
                belongs_to::<S, Self, BrowseReference>(
                    store,
                    rows,
                    nested,
                    |rate: &Self| Some(rate.browse_reference_id),
                    |rate: &mut Self, reference| rate.browse_reference = reference,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl BranchScoped for InterestRateByAmount {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}
