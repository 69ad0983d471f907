//! Loan statuses (current, past due, ...), seeded per branch.

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

/// A row from the `loan_statuses` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct LoanStatus {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

impl LoanStatus {
    pub fn new(tenant: TenantScope, name: &str, color: Option<&str>, description: Option<&str>) -> Self {
        Self {
            organization_id: tenant.organization_id,
            branch_id: tenant.branch_id,
            name: name.to_string(),
            color: color.map(str::to_string),
            description: description.map(str::to_string),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanStatusResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

impl From<&LoanStatus> for LoanStatusResponse {
    fn from(status: &LoanStatus) -> Self {
        Self {
            audit: AuditResponse::from(&status.audit),
            organization_id: status.organization_id,
            branch_id: status.branch_id,
            name: status.name.clone(),
            icon: status.icon.clone(),
            color: status.color.clone(),
            description: status.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoanStatusRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 100))]
    pub icon: Option<String>,
    #[validate(length(max = 20))]
    pub color: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

impl EntityRequest<LoanStatus> for LoanStatusRequest {
    fn to_entity(&self, user: &UserContext) -> LoanStatus {
        let mut status = LoanStatus::new(user.tenant(), &self.name, None, None);
        self.apply_to(&mut status);
        status
    }

    fn apply_to(&self, status: &mut LoanStatus) {
        status.name = self.name.clone();
        status.icon = self.icon.clone();
        status.color = self.color.clone();
        status.description = self.description.clone();
    }
}

#[async_trait]
impl Record for LoanStatus {
    const TABLE: &'static str = "loan_statuses";
    const KIND: &'static str = "loan_status";
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "branch_id",
        "name",
        "icon",
        "color",
        "description",
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
            ("name", self.name.clone().into()),
            ("icon", self.icon.clone().into()),
            ("color", self.color.clone().into()),
            ("description", self.description.clone().into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        tenant_scopes(self.tenant())
    }

    fn dependents() -> Vec<Dependent> {
        vec![Dependent::of::<LoanTransaction>("loan_status_id", OnDelete::SetNull)]
    }
}

impl BranchScoped for LoanStatus {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}
