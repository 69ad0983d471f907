//! Organizations: the root tenant every branch belongs to.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use coop_core::filter::Value;
use coop_core::tenant::UserContext;
use coop_core::topics::SCOPE_ORGANIZATION;
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::branch::{Branch, BranchResponse};
use crate::models::organization_daily_usage::OrganizationDailyUsage;
use crate::preload::{has_many, split_path, unknown_relation};
use crate::record::{Audit, AuditResponse, Dependent, OnDelete, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `organizations` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct Organization {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub name: String,
    pub address: Option<String>,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub is_private: bool,

    #[sqlx(skip)]
    pub branches: Vec<Branch>,
}

// ---------------------------------------------------------------------------
// Response DTO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub name: String,
    pub address: Option<String>,
    pub email: Option<String>,
    pub contact_number: Option<String>,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<BranchResponse>,
}

impl From<&Organization> for OrganizationResponse {
    fn from(org: &Organization) -> Self {
        Self {
            audit: AuditResponse::from(&org.audit),
            name: org.name.clone(),
            address: org.address.clone(),
            email: org.email.clone(),
            contact_number: org.contact_number.clone(),
            is_private: org.is_private,
            branches: org.branches.iter().map(BranchResponse::from).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request DTO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrganizationRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

impl EntityRequest<Organization> for OrganizationRequest {
    fn to_entity(&self, _user: &UserContext) -> Organization {
        let mut org = Organization::default();
        self.apply_to(&mut org);
        org
    }

    fn apply_to(&self, org: &mut Organization) {
        org.name = self.name.clone();
        org.address = self.address.clone();
        org.email = self.email.clone();
        org.contact_number = self.contact_number.clone();
        org.is_private = self.is_private;
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

#[async_trait]
impl Record for Organization {
    const TABLE: &'static str = "organizations";
    const KIND: &'static str = "organization";
    const COLUMNS: &'static [&'static str] =
        &["name", "address", "email", "contact_number", "is_private"];
    const TENANT_ROOT: Option<&'static str> = Some(SCOPE_ORGANIZATION);

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("name", self.name.clone().into()),
            ("address", self.address.clone().into()),
            ("email", self.email.clone().into()),
            ("contact_number", self.contact_number.clone().into()),
            ("is_private", self.is_private.into()),
        ]
    }

    /// The root tenant has no scope axes of its own.
    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        Vec::new()
    }

    fn dependents() -> Vec<Dependent> {
        vec![
            Dependent::of::<Branch>("organization_id", OnDelete::Restrict),
            Dependent::of::<OrganizationDailyUsage>("organization_id", OnDelete::Cascade),
        ]
    }

    fn clear_relations(&mut self) {
        self.branches.clear();
    }

    async fn preload<S: Store>(store: &S, rows: &mut [Self], path: &str) -> Result<(), DbError> {
        match split_path(path) {
            ("branches", nested) => {
                has_many::<S, Self, Branch>(
                    store,
                    rows,
                    nested,
                    "organization_id",
                    |branch: &Branch| Some(branch.organization_id),
                    |org: &mut Self, branches| org.branches = branches,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}
