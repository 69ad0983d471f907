//! Loan purposes, seeded per branch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use coop_core::filter::Value;
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::DbId;

use crate::models::loan_transaction::LoanTransaction;
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Dependent, OnDelete, Record};
use crate::registry::EntityRequest;

/// A row from the `loan_purposes` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct LoanPurpose {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub description: String,
    pub icon: Option<String>,
}

impl LoanPurpose {
    pub fn new(tenant: TenantScope, description: &str, icon: Option<&str>) -> Self {
        Self {
            organization_id: tenant.organization_id,
            branch_id: tenant.branch_id,
            description: description.to_string(),
            icon: icon.map(str::to_string),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanPurposeResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub description: String,
    pub icon: Option<String>,
}

impl From<&LoanPurpose> for LoanPurposeResponse {
    fn from(purpose: &LoanPurpose) -> Self {
        Self {
            audit: AuditResponse::from(&purpose.audit),
            organization_id: purpose.organization_id,
            branch_id: purpose.branch_id,
            description: purpose.description.clone(),
            icon: purpose.icon.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoanPurposeRequest {
    #[validate(length(min = 1, max = 255))]
    pub description: String,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
}

impl EntityRequest<LoanPurpose> for LoanPurposeRequest {
    fn to_entity(&self, user: &UserContext) -> LoanPurpose {
        LoanPurpose::new(user.tenant(), &self.description, self.icon.as_deref())
    }

    fn apply_to(&self, purpose: &mut LoanPurpose) {
        purpose.description = self.description.clone();
        purpose.icon = self.icon.clone();
    }
}

#[async_trait]
impl Record for LoanPurpose {
    const TABLE: &'static str = "loan_purposes";
    const KIND: &'static str = "loan_purpose";
    const COLUMNS: &'static [&'static str] = &["organization_id", "branch_id", "description", "icon"];

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
            ("description", self.description.clone().into()),
            ("icon", self.icon.clone().into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        tenant_scopes(self.tenant())
    }

    fn dependents() -> Vec<Dependent> {
        vec![Dependent::of::<LoanTransaction>("loan_purpose_id", OnDelete::SetNull)]
    }
}

impl BranchScoped for LoanPurpose {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}
