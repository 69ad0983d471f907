//! Amount brackets of a charges rate scheme.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use coop_core::charges::compute_charge;
use coop_core::filter::Value;
use coop_core::ranges::validate_amount_range;
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::DbId;
use coop_core::validation::schema_error;

use crate::error::DbError;
use crate::models::charges_rate_scheme::ChargesRateScheme;
use crate::preload::{belongs_to, split_path, unknown_relation};
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

/// Topic axis of the owning scheme.
pub const SCOPE_CHARGES_RATE_SCHEME: &str = "charges_rate_scheme";

/// A row from the `charges_rate_by_range_or_minimum_amounts` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct ChargesRateByRangeOrMinimumAmount {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub charges_rate_scheme_id: DbId,
    pub from_amount: f64,
    pub to_amount: f64,
    /// Percentage of the loan amount.
    pub charge: f64,
    /// Fixed amount added to the percentage.
    pub amount: f64,
    pub minimum_amount: f64,

    #[sqlx(skip)]
    pub charges_rate_scheme: Option<Box<ChargesRateScheme>>,
}

impl ChargesRateByRangeOrMinimumAmount {
    pub fn compute(&self, loan_amount: f64) -> f64 {
        compute_charge(loan_amount, self.charge, self.amount, self.minimum_amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargesRateByRangeOrMinimumAmountResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub charges_rate_scheme_id: DbId,
    pub from_amount: f64,
    pub to_amount: f64,
    pub charge: f64,
    pub amount: f64,
    pub minimum_amount: f64,
}

impl From<&ChargesRateByRangeOrMinimumAmount> for ChargesRateByRangeOrMinimumAmountResponse {
    fn from(range: &ChargesRateByRangeOrMinimumAmount) -> Self {
        Self {
            audit: AuditResponse::from(&range.audit),
            organization_id: range.organization_id,
            branch_id: range.branch_id,
            charges_rate_scheme_id: range.charges_rate_scheme_id,
            from_amount: range.from_amount,
            to_amount: range.to_amount,
            charge: range.charge,
            amount: range.amount,
            minimum_amount: range.minimum_amount,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_charge_bracket"))]
pub struct ChargesRateByRangeOrMinimumAmountRequest {
    pub id: Option<DbId>,
    #[serde(default)]
    pub charges_rate_scheme_id: DbId,
    pub from_amount: f64,
    pub to_amount: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    #[serde(default)]
    pub charge: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub amount: f64,
    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub minimum_amount: f64,
}

fn validate_charge_bracket(request: &ChargesRateByRangeOrMinimumAmountRequest) -> Result<(), ValidationError> {
    schema_error(
        "amount_range",
        validate_amount_range(request.from_amount, request.to_amount, "Charge bracket"),
    )
}

impl EntityRequest<ChargesRateByRangeOrMinimumAmount> for ChargesRateByRangeOrMinimumAmountRequest {
    fn to_entity(&self, user: &UserContext) -> ChargesRateByRangeOrMinimumAmount {
        let mut range = ChargesRateByRangeOrMinimumAmount {
            organization_id: user.organization_id,
            branch_id: user.branch_id,
            charges_rate_scheme_id: self.charges_rate_scheme_id,
            ..Default::default()
        };
        if let Some(id) = self.id {
            range.audit.id = id;
        }
        self.apply_to(&mut range);
        range
    }

    fn apply_to(&self, range: &mut ChargesRateByRangeOrMinimumAmount) {
        range.from_amount = self.from_amount;
        range.to_amount = self.to_amount;
        range.charge = self.charge;
        range.amount = self.amount;
        range.minimum_amount = self.minimum_amount;
    }
}

#[async_trait]
impl Record for ChargesRateByRangeOrMinimumAmount {
    const TABLE: &'static str = "charges_rate_by_range_or_minimum_amounts";
    const KIND: &'static str = "charges_rate_by_range_or_minimum_amount";
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "branch_id",
        "charges_rate_scheme_id",
        "from_amount",
        "to_amount",
        "charge",
        "amount",
        "minimum_amount",
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
            ("charges_rate_scheme_id", self.charges_rate_scheme_id.into()),
            ("from_amount", self.from_amount.into()),
            ("to_amount", self.to_amount.into()),
            ("charge", self.charge.into()),
            ("amount", self.amount.into()),
            ("minimum_amount", self.minimum_amount.into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        let mut scopes = tenant_scopes(self.tenant());
        scopes.push((SCOPE_CHARGES_RATE_SCHEME, self.charges_rate_scheme_id));
        scopes
    }

    fn clear_relations(&mut self) {
        self.charges_rate_scheme = None;
    }

    async fn preload<S: Store>(store: &S, rows: &mut [Self], path: &str) -> Result<(), DbError> {
        match split_path(path) {
            ("charges_rate_scheme", nested) => {
                belongs_to::<S, Self, ChargesRateScheme>(
                    store,
                    rows,
                    nested,
                    |range: &Self| Some(range.charges_rate_scheme_id),
                    |range: &mut Self, scheme| range.charges_rate_scheme = scheme,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl BranchScoped for ChargesRateByRangeOrMinimumAmount {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}
