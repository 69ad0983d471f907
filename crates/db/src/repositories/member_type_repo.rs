//! Repository for the `member_types` table.

use crate::models::member_type::{MemberType, MemberTypeRequest, MemberTypeResponse};
use crate::registry::{Registry, RegistryParams};
use crate::store::postgres::PgStore;
use crate::store::Store;

pub type MemberTypeRepo<S = PgStore> = Registry<MemberType, MemberTypeResponse, MemberTypeRequest, S>;

pub fn member_type_registry<S: Store>(store: S) -> MemberTypeRepo<S> {
    Registry::new(
        store,
        RegistryParams::standard(Vec::new(), |member_type: &MemberType| {
            MemberTypeResponse::from(member_type)
        }),
    )
}
