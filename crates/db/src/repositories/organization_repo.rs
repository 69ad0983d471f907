//! Repository for the `organizations` table.

use crate::models::organization::{Organization, OrganizationRequest, OrganizationResponse};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type OrganizationRepo<S = PgStore> =
    Registry<Organization, OrganizationResponse, OrganizationRequest, S>;

pub fn organization_registry<S: Store>(store: S) -> OrganizationRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(Vec::new(), |org: &Organization| {
            OrganizationResponse::from(org)
        }),
    )
}
