//! Branches: the second tenant axis, owned by an organization.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use coop_core::filter::Value;
use coop_core::tenant::UserContext;
use coop_core::topics::SCOPE_ORGANIZATION;
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::member_profile::MemberProfile;
use crate::models::organization::{Organization, OrganizationResponse};
use crate::preload::{belongs_to, split_path, unknown_relation};
use crate::record::{Audit, AuditResponse, Dependent, OnDelete, OrganizationScoped, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

/// A row from the `branches` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct Branch {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub name: String,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub is_main_branch: bool,

    #[sqlx(skip)]
    pub organization: Option<Box<Organization>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub name: String,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub is_main_branch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<Box<OrganizationResponse>>,
}

impl From<&Branch> for BranchResponse {
    fn from(branch: &Branch) -> Self {
        Self {
            audit: AuditResponse::from(&branch.audit),
            organization_id: branch.organization_id,
            name: branch.name.clone(),
            address: branch.address.clone(),
            contact_number: branch.contact_number.clone(),
            is_main_branch: branch.is_main_branch,
            organization: branch
                .organization
                .as_deref()
                .map(OrganizationResponse::from)
                .map(Box::new),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BranchRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub is_main_branch: bool,
}

impl EntityRequest<Branch> for BranchRequest {
    fn to_entity(&self, user: &UserContext) -> Branch {
        let mut branch = Branch {
            organization_id: user.organization_id,
            ..Default::default()
        };
        self.apply_to(&mut branch);
        branch
    }

    fn apply_to(&self, branch: &mut Branch) {
        branch.name = self.name.clone();
        branch.address = self.address.clone();
        branch.contact_number = self.contact_number.clone();
        branch.is_main_branch = self.is_main_branch;
    }
}

#[async_trait]
impl Record for Branch {
    const TABLE: &'static str = "branches";
    const KIND: &'static str = "branch";
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "name",
        "address",
        "contact_number",
        "is_main_branch",
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
            ("name", self.name.clone().into()),
            ("address", self.address.clone().into()),
            ("contact_number", self.contact_number.clone().into()),
            ("is_main_branch", self.is_main_branch.into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        vec![(SCOPE_ORGANIZATION, self.organization_id)]
    }

    fn dependents() -> Vec<Dependent> {
        vec![Dependent::of::<MemberProfile>("branch_id", OnDelete::Restrict)]
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
                    |branch: &Self| Some(branch.organization_id),
                    |branch: &mut Self, org| branch.organization = org,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl OrganizationScoped for Branch {
    fn organization_id(&self) -> DbId {
        self.organization_id
    }
}
