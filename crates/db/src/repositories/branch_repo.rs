//! Repository for the `branches` table.

use crate::models::branch::{Branch, BranchRequest, BranchResponse};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type BranchRepo<S = PgStore> = Registry<Branch, BranchResponse, BranchRequest, S>;

pub fn branch_registry<S: Store>(store: S) -> BranchRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(vec!["organization"], |branch: &Branch| {
            BranchResponse::from(branch)
        }),
    )
}
