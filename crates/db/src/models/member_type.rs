//! Member types (regular, associate, ...), seeded per branch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use coop_core::filter::Value;
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::DbId;

use crate::models::browse_reference::BrowseReference;
use crate::models::member_profile::MemberProfile;
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Dependent, OnDelete, Record};
use crate::registry::EntityRequest;

/// A row from the `member_types` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct MemberType {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub prefix: String,
    pub name: String,
    pub description: Option<String>,
}

impl MemberType {
    pub fn new(tenant: TenantScope, prefix: &str, name: &str, description: Option<&str>) -> Self {
        Self {
            organization_id: tenant.organization_id,
            branch_id: tenant.branch_id,
            prefix: prefix.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberTypeResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub prefix: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<&MemberType> for MemberTypeResponse {
    fn from(member_type: &MemberType) -> Self {
        Self {
            audit: AuditResponse::from(&member_type.audit),
            organization_id: member_type.organization_id,
            branch_id: member_type.branch_id,
            prefix: member_type.prefix.clone(),
            name: member_type.name.clone(),
            description: member_type.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MemberTypeRequest {
    #[validate(length(min = 1, max = 10))]
    pub prefix: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

impl EntityRequest<MemberType> for MemberTypeRequest {
    fn to_entity(&self, user: &UserContext) -> MemberType {
        MemberType::new(
            user.tenant(),
            &self.prefix,
            &self.name,
            self.description.as_deref(),
        )
    }

    fn apply_to(&self, member_type: &mut MemberType) {
        member_type.prefix = self.prefix.clone();
        member_type.name = self.name.clone();
        member_type.description = self.description.clone();
    }
}

#[async_trait]
impl Record for MemberType {
    const TABLE: &'static str = "member_types";
    const KIND: &'static str = "member_type";
    const COLUMNS: &'static [&'static str] =
        &["organization_id", "branch_id", "prefix", "name", "description"];

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
            ("prefix", self.prefix.clone().into()),
            ("name", self.name.clone().into()),
            ("description", self.description.clone().into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        tenant_scopes(self.tenant())
    }

    fn dependents() -> Vec<Dependent> {
        vec![
            Dependent::of::<MemberProfile>("member_type_id", OnDelete::SetNull),
            Dependent::of::<BrowseReference>("member_type_id", OnDelete::SetNull),
        ]
    }
}

impl BranchScoped for MemberType {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}
