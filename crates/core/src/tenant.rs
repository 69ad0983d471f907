//! Two-level tenancy: every branch-scoped row belongs to one organization
//! and one of its branches.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// The `(organization, branch)` partition a query or write is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope {
    pub organization_id: DbId,
    pub branch_id: DbId,
}

impl TenantScope {
    pub fn new(organization_id: DbId, branch_id: DbId) -> Self {
        Self {
            organization_id,
            branch_id,
        }
    }
}

/// The acting user and the tenant their session is bound to.
///
/// Writes stamp `user_id` into the audit columns; requests are built into
/// entities under `tenant()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: DbId,
    pub organization_id: DbId,
    pub branch_id: DbId,
}

impl UserContext {
    pub fn new(user_id: DbId, tenant: TenantScope) -> Self {
        Self {
            user_id,
            organization_id: tenant.organization_id,
            branch_id: tenant.branch_id,
        }
    }

    pub fn tenant(&self) -> TenantScope {
        TenantScope::new(self.organization_id, self.branch_id)
    }
}
