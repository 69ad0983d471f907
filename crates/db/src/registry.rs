//! Generic entity registry: CRUD with preloads, projections and change
//! events.
//!
//! A `Registry<T, R, Q, S>` binds an entity `T` to its response DTO `R`, its
//! request DTO `Q` and a [`Store`]. Every write derives the entity's topic
//! list and response payload and enqueues them to the outbox in the same
//! transaction as the row itself.

use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use coop_core::filter::{FilterSql, Query, SortSpec};
use coop_core::tenant::UserContext;
use coop_core::topics::{entity_topics, Action, SCOPE_BRANCH, SCOPE_ORGANIZATION};
use coop_core::types::DbId;
use coop_core::validation::validate_request;

use crate::error::DbError;
use crate::outbox::OutboxEvent;
use crate::record::{BranchScoped, OrganizationScoped, Record};
use crate::store::postgres::PgStore;
use crate::store::Store;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A validated request DTO that creates or mutates an entity.
pub trait EntityRequest<T>: Validate + Send + Sync {
    /// Build a new entity in the user's tenant.
    fn to_entity(&self, user: &UserContext) -> T;

    /// Copy the mutable fields onto an existing entity.
    fn apply_to(&self, entity: &mut T);
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

pub type TopicFn<T> = fn(&T) -> Vec<String>;

/// Per-entity wiring for a [`Registry`].
pub struct RegistryParams<T, R> {
    /// Relation paths loaded on every read, e.g. `"member_profile.member_type"`.
    pub preloads: Vec<&'static str>,
    pub resource: fn(&T) -> R,
    pub created: TopicFn<T>,
    pub updated: TopicFn<T>,
    pub deleted: TopicFn<T>,
}

impl<T: Record, R> RegistryParams<T, R> {
    /// Params with the standard topic functions derived from
    /// [`Record::scopes`].
    pub fn standard(preloads: Vec<&'static str>, resource: fn(&T) -> R) -> Self {
        Self {
            preloads,
            resource,
            created: created_topics::<T>,
            updated: updated_topics::<T>,
            deleted: deleted_topics::<T>,
        }
    }
}

impl<T, R> Clone for RegistryParams<T, R> {
    fn clone(&self) -> Self {
        Self {
            preloads: self.preloads.clone(),
            resource: self.resource,
            created: self.created,
            updated: self.updated,
            deleted: self.deleted,
        }
    }
}

pub fn created_topics<T: Record>(entity: &T) -> Vec<String> {
    entity_topics(T::KIND, Action::Create, entity.id(), &entity.scopes())
}

pub fn updated_topics<T: Record>(entity: &T) -> Vec<String> {
    entity_topics(T::KIND, Action::Update, entity.id(), &entity.scopes())
}

pub fn deleted_topics<T: Record>(entity: &T) -> Vec<String> {
    entity_topics(T::KIND, Action::Delete, entity.id(), &entity.scopes())
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct Registry<T, R, Q, S = PgStore> {
    store: S,
    params: RegistryParams<T, R>,
    timeout: Option<Duration>,
    _request: PhantomData<fn(&Q)>,
}

impl<T, R, Q, S: Clone> Clone for Registry<T, R, Q, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            params: self.params.clone(),
            timeout: self.timeout,
            _request: PhantomData,
        }
    }
}

impl<T, R, Q, S> Registry<T, R, Q, S>
where
    T: Record,
    R: Serialize,
    Q: EntityRequest<T>,
    S: Store,
{
    pub fn new(store: S, params: RegistryParams<T, R>) -> Self {
        Self {
            store,
            params,
            timeout: None,
            _request: PhantomData,
        }
    }

    /// Bound every store call made through this registry.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn preloads(&self) -> &[&'static str] {
        &self.params.preloads
    }

    async fn bounded<O>(&self, fut: impl Future<Output = Result<O, DbError>>) -> Result<O, DbError> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| DbError::Timeout {
                    entity: T::KIND,
                    timeout,
                })?,
            None => fut.await,
        }
    }

    async fn load(&self, query: &Query) -> Result<Vec<T>, DbError> {
        let mut rows = self.store.select::<T>(query).await?;
        for path in &self.params.preloads {
            T::preload(&self.store, &mut rows, path).await?;
        }
        Ok(rows)
    }

    // -- reads --------------------------------------------------------------

    /// Rows matching an explicit query, with preloads applied.
    pub async fn find_with_sql(&self, query: Query) -> Result<Vec<T>, DbError> {
        self.bounded(self.load(&query)).await
    }

    pub async fn arr_find(
        &self,
        filters: Vec<FilterSql>,
        sorts: Vec<SortSpec>,
    ) -> Result<Vec<T>, DbError> {
        self.find_with_sql(Query::from_parts(filters, sorts)).await
    }

    /// Rows matching every filter, newest first.
    pub async fn find(&self, filters: Vec<FilterSql>) -> Result<Vec<T>, DbError> {
        self.arr_find(filters, vec![SortSpec::desc("created_at")]).await
    }

    pub async fn find_first(&self, query: Query) -> Result<Option<T>, DbError> {
        Ok(self.find_with_sql(query.limit(1)).await?.into_iter().next())
    }

    /// First row of `query`, or [`DbError::NoMatch`].
    pub async fn find_one_with_sql(&self, query: Query) -> Result<T, DbError> {
        self.find_first(query)
            .await?
            .ok_or(DbError::NoMatch { entity: T::KIND })
    }

    pub async fn get_by_id(&self, id: DbId) -> Result<T, DbError> {
        self.find_first(Query::new().filter(FilterSql::eq("id", id)))
            .await?
            .ok_or(DbError::NotFound {
                entity: T::KIND,
                id,
            })
    }

    /// [`Registry::get_by_id`] limited to the user's tenant. Rows of other
    /// tenants are reported as not found.
    pub async fn get_for_user(&self, user: &UserContext, id: DbId) -> Result<T, DbError> {
        let entity = self.get_by_id(id).await?;
        if !visible_to(&entity, user) {
            return Err(DbError::NotFound {
                entity: T::KIND,
                id,
            });
        }
        Ok(entity)
    }

    // -- writes -------------------------------------------------------------

    async fn emit(&self, tx: &mut S::Tx, action: Action, entity: &T) -> Result<(), DbError> {
        let topics = self.topics(action, entity);
        let payload = serde_json::to_value((self.params.resource)(entity))?;
        let event = OutboxEvent::new(T::KIND, action, entity.id(), topics, payload);
        self.store.enqueue(tx, &event).await?;
        tracing::debug!(
            entity = T::KIND,
            id = %entity.id(),
            action = %action,
            topics = event.topics.len(),
            "Enqueued change event"
        );
        Ok(())
    }

    /// Run the entity's write rules for an update. Returns whether a live
    /// row with the entity's id exists; callers report or insert when it
    /// does not.
    async fn check_replacement(&self, entity: &T) -> Result<bool, DbError> {
        if !T::COMPARES_STORED {
            entity.check()?;
            return Ok(true);
        }
        let query = Query::new()
            .filter(FilterSql::eq("id", entity.id()))
            .limit(1);
        let stored = self.bounded(self.store.select::<T>(&query)).await?;
        match stored.first() {
            Some(stored) => {
                entity.check_update(stored)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn create(&self, actor: DbId, entity: T) -> Result<T, DbError> {
        let mut tx = self.store.begin().await?;
        let created = self.create_with_tx(&mut tx, actor, entity).await?;
        self.store.commit(tx).await?;
        Ok(created)
    }

    /// Insert inside a caller-owned transaction. The event is only published
    /// if the caller commits.
    pub async fn create_with_tx(&self, tx: &mut S::Tx, actor: DbId, mut entity: T) -> Result<T, DbError> {
        entity.check_insert()?;
        entity.audit_mut().stamp_created(actor, Utc::now());
        let created = self.bounded(self.store.insert(tx, &entity)).await?;
        self.emit(tx, Action::Create, &created).await?;
        Ok(created)
    }

    pub async fn update(&self, actor: DbId, entity: T) -> Result<T, DbError> {
        let mut tx = self.store.begin().await?;
        let updated = self.update_with_tx(&mut tx, actor, entity).await?;
        self.store.commit(tx).await?;
        Ok(updated)
    }

    pub async fn update_with_tx(&self, tx: &mut S::Tx, actor: DbId, mut entity: T) -> Result<T, DbError> {
        let id = entity.id();
        self.check_replacement(&entity).await?;
        entity.audit_mut().stamp_updated(actor, Utc::now());
        let updated = self
            .bounded(self.store.update(tx, &entity))
            .await?
            .ok_or(DbError::NotFound {
                entity: T::KIND,
                id,
            })?;
        self.emit(tx, Action::Update, &updated).await?;
        Ok(updated)
    }

    /// Update the row when its id is live, insert it otherwise.
    pub async fn upsert_with_tx(&self, tx: &mut S::Tx, actor: DbId, mut entity: T) -> Result<T, DbError> {
        if entity.id().is_nil() {
            return self.create_with_tx(tx, actor, entity).await;
        }
        if !self.check_replacement(&entity).await? {
            return self.create_with_tx(tx, actor, entity).await;
        }
        entity.audit_mut().stamp_updated(actor, Utc::now());
        match self.bounded(self.store.update(tx, &entity)).await? {
            Some(updated) => {
                self.emit(tx, Action::Update, &updated).await?;
                Ok(updated)
            }
            None => self.create_with_tx(tx, actor, entity).await,
        }
    }

    /// Soft-delete a row, applying the delete policy of its dependents.
    pub async fn delete(&self, actor: DbId, id: DbId) -> Result<T, DbError> {
        let mut tx = self.store.begin().await?;
        let deleted = self.delete_with_tx(&mut tx, actor, id).await?;
        self.store.commit(tx).await?;
        Ok(deleted)
    }

    pub async fn delete_with_tx(&self, tx: &mut S::Tx, actor: DbId, id: DbId) -> Result<T, DbError> {
        let deleted = self
            .bounded(self.store.soft_delete::<T>(tx, id, Some(actor), Utc::now()))
            .await?
            .ok_or(DbError::NotFound {
                entity: T::KIND,
                id,
            })?;
        self.emit(tx, Action::Delete, &deleted).await?;
        Ok(deleted)
    }

    // -- requests -----------------------------------------------------------

    pub async fn create_from_request(&self, user: &UserContext, request: &Q) -> Result<T, DbError> {
        validate_request(request)?;
        self.create(user.user_id, request.to_entity(user)).await
    }

    /// Apply a request to a row of the user's tenant.
    pub async fn update_from_request(
        &self,
        user: &UserContext,
        id: DbId,
        request: &Q,
    ) -> Result<T, DbError> {
        validate_request(request)?;
        let mut entity = self.get_for_user(user, id).await?;
        request.apply_to(&mut entity);
        entity.clear_relations();
        self.update(user.user_id, entity).await
    }

    // -- projection ---------------------------------------------------------

    pub fn to_model(&self, entity: Option<&T>) -> Option<R> {
        entity.map(self.params.resource)
    }

    pub fn to_models(&self, entities: &[T]) -> Vec<R> {
        entities.iter().map(self.params.resource).collect()
    }

    pub fn topics(&self, action: Action, entity: &T) -> Vec<String> {
        let topics = match action {
            Action::Create => self.params.created,
            Action::Update => self.params.updated,
            Action::Delete => self.params.deleted,
        };
        topics(entity)
    }
}

/// Whether every tenant axis of the row matches the user's session.
fn visible_to<T: Record>(entity: &T, user: &UserContext) -> bool {
    let own = T::TENANT_ROOT.map(|axis| (axis, entity.id()));
    entity.scopes().into_iter().chain(own).all(|(axis, id)| match axis {
        SCOPE_BRANCH => id == user.branch_id,
        SCOPE_ORGANIZATION => id == user.organization_id,
        _ => true,
    })
}

impl<T, R, Q, S> Registry<T, R, Q, S>
where
    T: BranchScoped,
    R: Serialize,
    Q: EntityRequest<T>,
    S: Store,
{
    /// Every live row of one branch.
    pub async fn current_branch(&self, organization_id: DbId, branch_id: DbId) -> Result<Vec<T>, DbError> {
        self.find(vec![
            FilterSql::eq("organization_id", organization_id),
            FilterSql::eq("branch_id", branch_id),
        ])
        .await
    }
}

impl<T, R, Q, S> Registry<T, R, Q, S>
where
    T: OrganizationScoped,
    R: Serialize,
    Q: EntityRequest<T>,
    S: Store,
{
    /// Every live row of one organization.
    pub async fn current_organization(&self, organization_id: DbId) -> Result<Vec<T>, DbError> {
        self.find(vec![FilterSql::eq("organization_id", organization_id)])
            .await
    }
}
