//! Member profiles: the people who borrow, save and contribute.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use coop_core::filter::Value;
use coop_core::member::{full_name, MemberStatus};
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::DbId;

use crate::error::DbError;
use crate::models::loan_transaction::LoanTransaction;
use crate::models::member_type::{MemberType, MemberTypeResponse};
use crate::models::mutual_fund::MutualFund;
use crate::models::mutual_fund_entry::MutualFundEntry;
use crate::preload::{belongs_to, split_path, unknown_relation};
use crate::record::{tenant_scopes, Audit, AuditResponse, BranchScoped, Dependent, OnDelete, Record};
use crate::registry::EntityRequest;
use crate::store::Store;

/// A row from the `member_profiles` table.
#[derive(Debug, Clone, Default, FromRow)]
pub struct MemberProfile {
    #[sqlx(flatten)]
    pub audit: Audit,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub member_type_id: Option<DbId>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    /// Derived from the name parts on every write.
    pub full_name: String,
    pub passbook: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: MemberStatus,
    pub contact_number: Option<String>,
    pub is_closed: bool,

    #[sqlx(skip)]
    pub member_type: Option<Box<MemberType>>,
}

impl MemberProfile {
    pub fn refresh_full_name(&mut self) {
        self.full_name = full_name(
            &self.first_name,
            self.middle_name.as_deref(),
            &self.last_name,
            self.suffix.as_deref(),
        );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberProfileResponse {
    #[serde(flatten)]
    pub audit: AuditResponse,
    pub organization_id: DbId,
    pub branch_id: DbId,
    pub member_type_id: Option<DbId>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,
    pub full_name: String,
    pub passbook: Option<String>,
    pub status: MemberStatus,
    pub contact_number: Option<String>,
    pub is_closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_type: Option<Box<MemberTypeResponse>>,
}

impl From<&MemberProfile> for MemberProfileResponse {
    fn from(member: &MemberProfile) -> Self {
        Self {
            audit: AuditResponse::from(&member.audit),
            organization_id: member.organization_id,
            branch_id: member.branch_id,
            member_type_id: member.member_type_id,
            first_name: member.first_name.clone(),
            middle_name: member.middle_name.clone(),
            last_name: member.last_name.clone(),
            suffix: member.suffix.clone(),
            full_name: member.full_name.clone(),
            passbook: member.passbook.clone(),
            status: member.status,
            contact_number: member.contact_number.clone(),
            is_closed: member.is_closed,
            member_type: member
                .member_type
                .as_deref()
                .map(MemberTypeResponse::from)
                .map(Box::new),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MemberProfileRequest {
    pub member_type_id: Option<DbId>,
    #[validate(length(min = 1, max = 255))]
    pub first_name: String,
    #[validate(length(max = 255))]
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub last_name: String,
    #[validate(length(max = 20))]
    pub suffix: Option<String>,
    #[validate(length(max = 100))]
    pub passbook: Option<String>,
    #[serde(default)]
    pub status: MemberStatus,
    #[validate(length(max = 50))]
    pub contact_number: Option<String>,
    #[serde(default)]
    pub is_closed: bool,
}

impl EntityRequest<MemberProfile> for MemberProfileRequest {
    fn to_entity(&self, user: &UserContext) -> MemberProfile {
        let mut member = MemberProfile {
            organization_id: user.organization_id,
            branch_id: user.branch_id,
            ..Default::default()
        };
        self.apply_to(&mut member);
        member
    }

    fn apply_to(&self, member: &mut MemberProfile) {
        member.member_type_id = self.member_type_id;
        member.first_name = self.first_name.clone();
        member.middle_name = self.middle_name.clone();
        member.last_name = self.last_name.clone();
        member.suffix = self.suffix.clone();
        member.passbook = self.passbook.clone();
        member.status = self.status;
        member.contact_number = self.contact_number.clone();
        member.is_closed = self.is_closed;
        member.refresh_full_name();
    }
}

#[async_trait]
impl Record for MemberProfile {
    const TABLE: &'static str = "member_profiles";
    const KIND: &'static str = "member_profile";
    const COLUMNS: &'static [&'static str] = &[
        "organization_id",
        "branch_id",
        "member_type_id",
        "first_name",
        "middle_name",
        "last_name",
        "suffix",
        "full_name",
        "passbook",
        "status",
        "contact_number",
        "is_closed",
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
            ("member_type_id", self.member_type_id.into()),
            ("first_name", self.first_name.clone().into()),
            ("middle_name", self.middle_name.clone().into()),
            ("last_name", self.last_name.clone().into()),
            ("suffix", self.suffix.clone().into()),
            ("full_name", self.full_name.clone().into()),
            ("passbook", self.passbook.clone().into()),
            ("status", self.status.as_str().into()),
            ("contact_number", self.contact_number.clone().into()),
            ("is_closed", self.is_closed.into()),
        ]
    }

    fn scopes(&self) -> Vec<(&'static str, DbId)> {
        tenant_scopes(self.tenant())
    }

    fn dependents() -> Vec<Dependent> {
        vec![
            Dependent::of::<LoanTransaction>("member_profile_id", OnDelete::Restrict),
            Dependent::of::<MutualFund>("member_profile_id", OnDelete::Restrict),
            Dependent::of::<MutualFundEntry>("member_profile_id", OnDelete::Restrict),
        ]
    }

    fn clear_reference(&mut self, column: &str) {
        if column == "member_type_id" {
            self.member_type_id = None;
        }
    }

    fn clear_relations(&mut self) {
        self.member_type = None;
    }

    async fn preload<S: Store>(store: &S, rows: &mut [Self], path: &str) -> Result<(), DbError> {
        match split_path(path) {
            ("member_type", nested) => {
                belongs_to::<S, Self, MemberType>(
                    store,
                    rows,
                    nested,
                    |member: &Self| member.member_type_id,
                    |member: &mut Self, member_type| member.member_type = member_type,
                )
                .await
            }
            _ => Err(unknown_relation::<Self>(path)),
        }
    }
}

impl BranchScoped for MemberProfile {
    fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_derives_full_name() {
        let request = MemberProfileRequest {
            member_type_id: None,
            first_name: "Ana".into(),
            middle_name: Some("B.".into()),
            last_name: "Reyes".into(),
            suffix: None,
            passbook: None,
            status: MemberStatus::Verified,
            contact_number: None,
            is_closed: false,
        };
        let user = UserContext::new(DbId::nil(), TenantScope::new(DbId::nil(), DbId::nil()));
        assert_eq!(request.to_entity(&user).full_name, "Ana B. Reyes");
    }

    #[test]
    fn response_without_member_type_omits_it() {
        let response = MemberProfileResponse::from(&MemberProfile::default());
        assert!(response.member_type.is_none());
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("member_type").is_none());
        assert_eq!(json["status"], "pending");
    }
}
