//! Charges rate schemes: named sets of charge brackets an account applies
//! to its loans.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use coop_core::charges::ChargesRateSchemeType;
use coop_core::error::CoreError;
use coop_core::filter::Value;
use coop_core::ranges::find_overlap;
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::DbId;
use coop_core::validation::schema_error;

use crate::error::DbError;
use crate::models::account::Account;
use crate::models::charges_rate_by_range_or_minimum_amount::{
    ChargesRateByRangeOrMinimumAmount, ChargesRateByRangeOrMinimumAmountRequest,
    ChargesRateByRangeOrMinimumAmountResponse,
};
use crate::preload::{has_many, split_path, unknown_relation};
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Dependent, OnDelete, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

/// A row from the `charges_rate_schemes` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct ChargesRateScheme {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub scheme_type: ChargesRateSchemeType,

    #[sqlx(skip)]
    pub charges_rate_by_range_or_minimum_amounts: Vec<ChargesRateByRangeOrMinimumAmount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChargesRateSchemeResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub scheme_type: ChargesRateSchemeType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub charges_rate_by_range_or_minimum_amounts: Vec<ChargesRateByRangeOrMinimumAmountResponse>,
}

impl From<&ChargesRateScheme> for ChargesRateSchemeResponse {
    fn from(scheme: &ChargesRateScheme) -> Self {
        Self {
            audit: AuditResponse::from(&scheme.audit),
            organization_id: scheme.organization_id,
            branch_id: scheme.branch_id,
            name: scheme.name.clone(),
            description: scheme.description.clone(),
            scheme_type: scheme.scheme_type,
            charges_rate_by_range_or_minimum_amounts: scheme
                .charges_rate_by_range_or_minimum_amounts
                .iter()
                .map(ChargesRateByRangeOrMinimumAmountResponse::from)
                .collect(),
        }
    }
}

/// A scheme header with its brackets, saved together. Brackets in one
/// request must not overlap.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_brackets"))]
pub struct ChargesRateSchemeRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    pub scheme_type: ChargesRateSchemeType,
    #[validate(nested)]
    #[serde(default)]
    pub charges_rate_by_range_or_minimum_amounts: Vec<ChargesRateByRangeOrMinimumAmountRequest>,
    #[serde(default)]
    pub charges_rate_by_range_or_minimum_amounts_deleted: Vec<DbId>,
}

fn validate_brackets(request: &ChargesRateSchemeRequest) -> Result<(), ValidationError> {
    let brackets: Vec<_> = request
        .charges_rate_by_range_or_minimum_amounts
        .iter()
        .map(|r| (r.from_amount, r.to_amount))
        .collect();
    let result = match find_overlap(&brackets) {
        Some((a, b)) => Err(CoreError::Validation(format!(
            "Charge brackets {a} and {b} overlap"
        ))),
        None => Ok(()),
    };
    schema_error("bracket_overlap", result)
}

impl ChargesRateScheme {
    /// Check that `request` leaves the scheme without overlapping brackets.
    ///
    /// Uses the loaded brackets: those the request neither rewrites nor
    /// deletes stay in place next to the requested ones.
    pub fn check_brackets_after(&self, request: &ChargesRateSchemeRequest) -> Result<(), CoreError> {
        let rewritten: Vec<DbId> = request
            .charges_rate_by_range_or_minimum_amounts
            .iter()
            .filter_map(|r| r.id)
            .chain(request.charges_rate_by_range_or_minimum_amounts_deleted.iter().copied())
            .collect();
        let brackets: Vec<(f64, f64)> = self
            .charges_rate_by_range_or_minimum_amounts
            .iter()
            .filter(|r| !rewritten.contains(&r.audit.id))
            .map(|r| (r.from_amount, r.to_amount))
            .chain(
                request
                    .charges_rate_by_range_or_minimum_amounts
                    .iter()
                    .map(|r| (r.from_amount, r.to_amount)),
            )
            .collect();
        match find_overlap(&brackets) {
            Some((a, b)) => Err(CoreError::Validation(format!(
                "Charge brackets {}..={} and {}..={} overlap",
                brackets[a].0, brackets[a].1, brackets[b].0, brackets[b].1
            ))),
            None => Ok(()),
        }
    }
}

impl EntityRequest<ChargesRateScheme> for ChargesRateSchemeRequest {
    fn to_entity(&self, user: &UserContext) -> ChargesRateScheme {
        let mut scheme = ChargesRateScheme {
            organization_id: user.organization_id,
            branch_id: user.branch_id,
            ..Default::default()
        };
        self.apply_to(&mut scheme);
        scheme
    }

    fn apply_to(&self, scheme: &mut ChargesRateScheme) {
        scheme.name = self.name.clone();
        scheme.description = self.description.clone();
        scheme.scheme_type = self.scheme_type;
    }
}

#[async_trait]
impl Record for ChargesRateScheme {
    const TABLE: &'static str = "charges_rate_schemes";
    const KIND: &'static str = "charges_rate_scheme";
    const COLUMNS: &'static [&'static str] =
        &["organization_id", "branch_id", "name", "description", "scheme_type"];

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
            ("name", self.name.clone().into()),
            ("description", self.description.clone().into()),
            ("scheme_type", self.scheme_type.as_str().into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        tenant_scopes(self.tenant())
    }

    fn dependents() -> Vec<Dependent> {
        vec![
            Dependent::of::<ChargesRateByRangeOrMinimumAmount>("charges_rate_scheme_id", OnDelete::Cascade),
            Dependent::of::<Account>("charges_rate_scheme_id", OnDelete::SetNull),
        ]
    }

    fn clear_relations(&mut self) {
        self.charges_rate_by_range_or_minimum_amounts.clear();
    }

    async fn preload<S: Store>(store: &S, rows: &mut [Self], path: &str) -> Result<(), DbError> {
        match split_path(path) {
            ("charges_rate_by_range_or_minimum_amounts", nested) => {
                has_many::<S, Self, ChargesRateByRangeOrMinimumAmount>(
                    store,
                    rows,
                    nested,
                    "charges_rate_scheme_id",
                    |range: &ChargesRateByRangeOrMinimumAmount| Some(range.charges_rate_scheme_id),
                    |scheme: &mut Self, ranges| scheme.charges_rate_by_range_or_minimum_amounts = ranges,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl BranchScoped for ChargesRateScheme {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bracket(from_amount: f64, to_amount: f64) -> ChargesRateByRangeOrMinimumAmountRequest {
        ChargesRateByRangeOrMinimumAmountRequest {
            id: None,
            charges_rate_scheme_id: DbId::nil(),
            from_amount,
            to_amount,
            charge: 1.0,
            amount: 0.0,
            minimum_amount: 0.0,
        }
    }

    fn request(brackets: Vec<ChargesRateByRangeOrMinimumAmountRequest>) -> ChargesRateSchemeRequest {
        ChargesRateSchemeRequest {
            name: "Service fee".into(),
            description: None,
            scheme_type: ChargesRateSchemeType::ByRange,
            charges_rate_by_range_or_minimum_amounts: brackets,
            charges_rate_by_range_or_minimum_amounts_deleted: Vec::new(),
        }
    }

    #[test]
    fn disjoint_brackets_pass() {
        let req = request(vec![bracket(0.0, 999.0), bracket(1000.0, 4999.0)]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn overlapping_brackets_fail() {
        let req = request(vec![bracket(0.0, 1500.0), bracket(1000.0, 4999.0)]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn inverted_nested_bracket_fails() {
        let req = request(vec![bracket(5000.0, 10.0)]);
        assert!(req.validate().is_err());
    }
}
