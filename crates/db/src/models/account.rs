//! Ledger accounts that loans, charges and browse references post to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use coop_core::account::AccountType;
use coop_core::filter::Value;
use coop_core::ranges::validate_amount_range;
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::DbId;
use coop_core::validation::schema_error;

use crate::error::DbError;
use crate::models::browse_reference::BrowseReference;
use crate::models::charges_rate_scheme::{ChargesRateScheme, ChargesRateSchemeResponse};
use crate::models::loan_transaction::LoanTransaction;
use crate::models::mutual_fund_entry::MutualFundEntry;
use crate::preload::{belongs_to, split_path, unknown_relation};
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Dependent, OnDelete, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

/// A row from the `accounts` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct Account {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub charges_rate_scheme_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub account_type: AccountType,
    /// Annual interest in percent.
    pub interest: f64,
    pub min_amount: f64,
    pub max_amount: f64,

    #[sqlx(skip)]
    pub charges_rate_scheme: Option<Box<ChargesRateScheme>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub charges_rate_scheme_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    pub account_type: AccountType,
    pub interest: f64,
    pub min_amount: f64,
    pub max_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charges_rate_scheme: Option<Box<ChargesRateSchemeResponse>>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            audit: AuditResponse::from(&account.audit),
            organization_id: account.organization_id,
            branch_id: account.branch_id,
            charges_rate_scheme_id: account.charges_rate_scheme_id,
            name: account.name.clone(),
            description: account.description.clone(),
            account_type: account.account_type,
            interest: account.interest,
            min_amount: account.min_amount,
            max_amount: account.max_amount,
            charges_rate_scheme: account
                .charges_rate_scheme
                .as_deref()
                .map(ChargesRateSchemeResponse::from)
                .map(Box::new),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_account_amounts"))]
pub struct AccountRequest {
    pub charges_rate_scheme_id: Option<DbId>,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub account_type: AccountType,
    #[validate(range(min = 0.0, max = 100.0))]
    pub interest: f64,
    #[serde(default)]
    pub min_amount: f64,
    #[serde(default)]
    pub max_amount: f64,
}

fn validate_account_amounts(request: &AccountRequest) -> Result<(), ValidationError> {
    schema_error(
        "amount_range",
        validate_amount_range(request.min_amount, request.max_amount, "Account amount"),
    )
}

impl EntityRequest<Account> for AccountRequest {
    fn to_entity(&self, user: &UserContext) -> Account {
        let mut account = Account {
            organization_id: user.organization_id,
            branch_id: user.branch_id,
            ..Default::default()
        };
        self.apply_to(&mut account);
        account
    }

    fn apply_to(&self, account: &mut Account) {
        account.charges_rate_scheme_id = self.charges_rate_scheme_id;
        account.name = self.name.clone();
        account.description = self.description.clone();
        account.account_type = self.account_type;
        account.interest = self.interest;
        account.min_amount = self.min_amount;
        account.max_amount = self.max_amount;
    }
}

#[async_trait]
impl Record for Account {
    const TABLE: &'static str = "accounts";
    const KIND: &'static str = "account";
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "branch_id",
        "charges_rate_scheme_id",
        "name",
        "description",
        "account_type",
        "interest",
        "min_amount",
        "max_amount",
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
            ("name", self.name.clone().into()),
            ("description", self.description.clone().into()),
            ("account_type", self.account_type.as_str().into()),
            ("interest", self.interest.into()),
            ("min_amount", self.min_amount.into()),
            ("max_amount", self.max_amount.into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        tenant_scopes(self.tenant())
    }

    fn dependents() -> Vec<Dependent> {
        vec![
            Dependent::of::<LoanTransaction>("account_id", OnDelete::Restrict),
            Dependent::of::<BrowseReference>("account_id", OnDelete::Cascade),
            Dependent::of::<MutualFundEntry>("account_id", OnDelete::SetNull),
        ]
    }

    fn clear_reference(&mut self, column: &str) {
        if column == "charges_rate_scheme_id" {
            self.charges_rate_scheme_id = None;
        }
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
                    |account: &Self| account.charges_rate_scheme_id,
                    |account: &mut Self, scheme| account.charges_rate_scheme = scheme,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl BranchScoped for Account {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(min_amount: f64, max_amount: f64) -> AccountRequest {
        AccountRequest {
            charges_rate_scheme_id: None,
            name: "Regular loan".into(),
            description: None,
            account_type: AccountType::Loan,
            interest: 12.0,
            min_amount,
            max_amount,
        }
    }

    #[test]
    fn max_below_min_is_rejected() {
        assert!(request(5_000.0, 1_000.0).validate().is_err());
        assert!(request(1_000.0, 5_000.0).validate().is_ok());
    }

    #[test]
    fn unknown_account_type_fails_to_deserialize() {
        let json = serde_json::json!({
            "name": "x",
            "account_type": "crypto",
            "interest": 1.0
        });
        assert!(serde_json::from_value::<AccountRequest>(json).is_err());
    }
}
