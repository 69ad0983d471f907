//! Repository for the `member_profiles` table.

use coop_core::filter::FilterSql;
use coop_core::member::MemberStatus;
use coop_core::tenant::TenantScope;

use crate::error::DbError;
use crate::models::member_profile::{MemberProfile, MemberProfileRequest, MemberProfileResponse};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type MemberProfileRepo<S = PgStore> =
    Registry<MemberProfile, MemberProfileResponse, MemberProfileRequest, S>;

pub fn member_profile_registry<S: Store>(store: S) -> MemberProfileRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(vec!["member_type"], |member: &MemberProfile| {
            MemberProfileResponse::from(member)
        }),
    )
}

impl<S: Store> Registry<MemberProfile, MemberProfileResponse, MemberProfileRequest, S> {
    pub async fn by_status(
        &self,
        tenant: TenantScope,
        status: MemberStatus,
    ) -> Result<Vec<MemberProfile>, DbError> {
        self.find(vec![
            FilterSql::eq("organization_id", tenant.organization_id),
            FilterSql::eq("branch_id", tenant.branch_id),
            FilterSql::eq("status", status.as_str()),
        ])
        .await
    }

    /// Case-insensitive substring match on the full name.
    pub async fn search(&self, tenant: TenantScope, name: &str) -> Result<Vec<MemberProfile>, DbError> {
        self.find(vec![
            FilterSql::eq("organization_id", tenant.organization_id),
            FilterSql::eq("branch_id", tenant.branch_id),
            FilterSql::like("full_name", format!("%{}%", name.trim())),
        ])
        .await
    }
}
