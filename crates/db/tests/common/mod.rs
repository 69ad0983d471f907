//! Shared fixtures for the registry integration tests.

#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use coop_core::account::AccountType;
use coop_core::filter::Query;
use coop_core::tenant::{TenantScope, UserContext};
use coop_core::types::{DbId, Timestamp};
use coop_db::models::account::Account;
use coop_db::models::branch::Branch;
use coop_db::models::member_profile::MemberProfile;
use coop_db::models::member_type::MemberType;
use coop_db::models::organization::Organization;
use coop_db::outbox::OutboxEvent;
use coop_db::record::Record;
use coop_db::repositories::{
    account_registry, branch_registry, member_profile_registry, member_type_registry,
    organization_registry,
};
use coop_db::store::memory::{MemoryStore, MemoryTx};
use coop_db::{DbError, Store};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A user bound to a fresh organization and branch.
pub fn user() -> UserContext {
    UserContext::new(Uuid::new_v4(), TenantScope::new(Uuid::new_v4(), Uuid::new_v4()))
}

/// Another user of the same organization, working in a different branch.
pub fn sibling_branch_user(user: &UserContext) -> UserContext {
    UserContext::new(
        Uuid::new_v4(),
        TenantScope::new(user.organization_id, Uuid::new_v4()),
    )
}

/// A user of an organization and branch that exist as rows, for stores
/// that enforce foreign keys.
pub async fn registered_user<S: Store>(store: &S) -> UserContext {
    let actor = Uuid::new_v4();
    let organization = organization_registry(store.clone())
        .create(
            actor,
            Organization {
                name: "Riverside Cooperative".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let branch = branch_registry(store.clone())
        .create(
            actor,
            Branch {
                organization_id: organization.audit.id,
                name: "Main".to_string(),
                is_main_branch: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    UserContext::new(actor, TenantScope::new(organization.audit.id, branch.audit.id))
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

pub async fn create_member_type<S: Store>(store: &S, user: &UserContext, prefix: &str) -> MemberType {
    member_type_registry(store.clone())
        .create(
            user.user_id,
            MemberType::new(user.tenant(), prefix, prefix, None),
        )
        .await
        .unwrap()
}

pub async fn create_member<S: Store>(
    store: &S,
    user: &UserContext,
    member_type_id: Option<DbId>,
    first_name: &str,
    last_name: &str,
) -> MemberProfile {
    let mut member = MemberProfile {
        organization_id: user.organization_id,
        branch_id: user.branch_id,
        member_type_id,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        ..Default::default()
    };
    member.refresh_full_name();
    member_profile_registry(store.clone())
        .create(user.user_id, member)
        .await
        .unwrap()
}

pub async fn create_account<S: Store>(store: &S, user: &UserContext, name: &str) -> Account {
    account_registry(store.clone())
        .create(
            user.user_id,
            Account {
                organization_id: user.organization_id,
                branch_id: user.branch_id,
                name: name.to_string(),
                account_type: AccountType::Loan,
                min_amount: 1_000.0,
                max_amount: 100_000.0,
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Faulty store
// ---------------------------------------------------------------------------

/// A [`MemoryStore`] that can refuse inserts into one table and delay reads.
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub refuse_inserts_into: Option<&'static str>,
    pub select_delay: Option<Duration>,
}

impl FaultyStore {
    pub fn refusing(table: &'static str) -> Self {
        Self {
            refuse_inserts_into: Some(table),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            select_delay: Some(delay),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Store for FaultyStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, DbError> {
        self.inner.begin().await
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), DbError> {
        self.inner.commit(tx).await
    }

    async fn insert<E: Record>(&self, tx: &mut Self::Tx, row: &E) -> Result<E, DbError> {
        if self.refuse_inserts_into == Some(E::TABLE) {
            return Err(DbError::Internal(format!("insert into {} refused", E::TABLE)));
        }
        self.inner.insert(tx, row).await
    }

    async fn update<E: Record>(&self, tx: &mut Self::Tx, row: &E) -> Result<Option<E>, DbError> {
        self.inner.update(tx, row).await
    }

    async fn soft_delete<E: Record>(
        &self,
        tx: &mut Self::Tx,
        id: DbId,
        actor: Option<DbId>,
        at: Timestamp,
    ) -> Result<Option<E>, DbError> {
        self.inner.soft_delete::<E>(tx, id, actor, at).await
    }

    async fn select<E: Record>(&self, query: &Query) -> Result<Vec<E>, DbError> {
        if let Some(delay) = self.select_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.select(query).await
    }

    async fn enqueue(&self, tx: &mut Self::Tx, event: &OutboxEvent) -> Result<(), DbError> {
        self.inner.enqueue(tx, event).await
    }

    async fn pending_events(&self, limit: i64) -> Result<Vec<OutboxEvent>, DbError> {
        self.inner.pending_events(limit).await
    }

    async fn mark_dispatched(&self, ids: &[DbId], at: Timestamp) -> Result<(), DbError> {
        self.inner.mark_dispatched(ids, at).await
    }
}
