//! In-memory store for tests and local development.
//!
//! Transactions work on a snapshot of every table and publish it on commit.
//! A commit fails with [`DbError::WriteConflict`] when another transaction
//! committed after the snapshot was taken, so concurrent writers never
//! silently lose updates.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use coop_core::filter::{Query, Value};
use coop_core::types::{DbId, Timestamp};

use crate::error::DbError;
use crate::outbox::OutboxEvent;
use crate::record::{Dependent, OnDelete, Record};
use crate::store::{validate_query, Store};

// ---------------------------------------------------------------------------
// Type-erased rows
// ---------------------------------------------------------------------------

/// Object-safe view of a stored [`Record`].
trait StoredRow: Send + Sync {
    fn row_id(&self) -> DbId;
    fn column(&self, column: &str) -> Option<Value>;
    fn is_deleted(&self) -> bool;
    fn mark_deleted(&mut self, actor: Option<DbId>, at: Timestamp);
    fn detach(&mut self, column: &str, at: Timestamp);
    fn clone_box(&self) -> Box<dyn StoredRow>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Record> StoredRow for E {
    fn row_id(&self) -> DbId {
        self.audit().id
    }

    fn column(&self, column: &str) -> Option<Value> {
        self.value(column)
    }

    fn is_deleted(&self) -> bool {
        self.audit().is_deleted()
    }

    fn mark_deleted(&mut self, actor: Option<DbId>, at: Timestamp) {
        self.audit_mut().stamp_deleted(actor, at);
    }

    fn detach(&mut self, column: &str, at: Timestamp) {
        self.clear_reference(column);
        self.audit_mut().updated_at = at;
    }

    fn clone_box(&self) -> Box<dyn StoredRow> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Clone for Box<dyn StoredRow> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

type Tables = HashMap<&'static str, Vec<Box<dyn StoredRow>>>;

#[derive(Default)]
struct MemoryState {
    version: u64,
    tables: Tables,
    outbox: Vec<OutboxEvent>,
}

/// An open in-memory transaction.
pub struct MemoryTx {
    base_version: u64,
    tables: Tables,
    outbox: Vec<OutboxEvent>,
}

/// Store keeping every table in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>, DbError> {
        self.state
            .read()
            .map_err(|_| DbError::Internal("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>, DbError> {
        self.state
            .write()
            .map_err(|_| DbError::Internal("memory store lock poisoned".into()))
    }

    /// Every committed outbox event, dispatched or not.
    pub fn outbox(&self) -> Result<Vec<OutboxEvent>, DbError> {
        Ok(self.read()?.outbox.clone())
    }

    /// A committed row by id, including soft-deleted rows.
    pub fn raw_row<E: Record>(&self, id: DbId) -> Result<Option<E>, DbError> {
        let state = self.read()?;
        Ok(state
            .tables
            .get(E::TABLE)
            .and_then(|rows| rows.iter().find(|row| row.row_id() == id))
            .and_then(|row| row.as_any().downcast_ref::<E>())
            .cloned())
    }
}

fn find_live<'t, E: Record>(tables: &'t mut Tables, id: DbId) -> Option<&'t mut E> {
    tables
        .get_mut(E::TABLE)?
        .iter_mut()
        .find(|row| row.row_id() == id && !row.is_deleted())?
        .as_any_mut()
        .downcast_mut::<E>()
}

fn live_referencing(tables: &Tables, dep: &Dependent, ids: &[DbId]) -> Vec<DbId> {
    tables
        .get(dep.table)
        .map(|rows| {
            rows.iter()
                .filter(|row| !row.is_deleted())
                .filter(|row| matches!(row.column(dep.column), Some(Value::Uuid(Some(id))) if ids.contains(&id)))
                .map(|row| row.row_id())
                .collect()
        })
        .unwrap_or_default()
}

/// Apply delete policies to the rows referencing `ids`, depth first.
fn apply_dependents(
    tables: &mut Tables,
    parent: &'static str,
    dependents: Vec<Dependent>,
    ids: &[DbId],
    actor: Option<DbId>,
    at: Timestamp,
) -> Result<(), DbError> {
    if ids.is_empty() {
        return Ok(());
    }

    for dep in dependents.iter().filter(|d| d.on_delete == OnDelete::Restrict) {
        if !live_referencing(tables, dep, ids).is_empty() {
            return Err(DbError::Restricted {
                entity: parent,
                dependent: dep.kind,
            });
        }
    }

    for dep in &dependents {
        let affected = live_referencing(tables, dep, ids);
        if affected.is_empty() || dep.on_delete == OnDelete::Restrict {
            continue;
        }
        if dep.on_delete == OnDelete::Cascade {
            apply_dependents(tables, dep.kind, (dep.dependents)(), &affected, actor, at)?;
        }
        if let Some(rows) = tables.get_mut(dep.table) {
            for row in rows.iter_mut().filter(|row| affected.contains(&row.row_id())) {
                match dep.on_delete {
                    OnDelete::Cascade => row.mark_deleted(actor, at),
                    OnDelete::SetNull => row.detach(dep.column, at),
                    OnDelete::Restrict => {}
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, DbError> {
        let state = self.read()?;
        Ok(MemoryTx {
            base_version: state.version,
            tables: state.tables.clone(),
            outbox: Vec::new(),
        })
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), DbError> {
        let mut state = self.write()?;
        if state.version != tx.base_version {
            return Err(DbError::WriteConflict);
        }
        state.version += 1;
        state.tables = tx.tables;
        state.outbox.extend(tx.outbox);
        Ok(())
    }

    async fn insert<E: Record>(&self, tx: &mut Self::Tx, row: &E) -> Result<E, DbError> {
        let rows = tx.tables.entry(E::TABLE).or_default();
        if rows.iter().any(|existing| existing.row_id() == row.audit().id) {
            return Err(DbError::DuplicateKey {
                entity: E::KIND,
                id: row.audit().id,
            });
        }
        let mut stored = row.clone();
        stored.clear_relations();
        rows.push(Box::new(stored.clone()));
        Ok(stored)
    }

    async fn update<E: Record>(&self, tx: &mut Self::Tx, row: &E) -> Result<Option<E>, DbError> {
        let Some(existing) = find_live::<E>(&mut tx.tables, row.audit().id) else {
            return Ok(None);
        };
        let mut stored = row.clone();
        stored.clear_relations();
        // Only domain columns and the update stamp change.
        let audit = stored.audit_mut();
        audit.created_at = existing.audit().created_at;
        audit.created_by_id = existing.audit().created_by_id;
        audit.deleted_at = None;
        audit.deleted_by_id = None;
        *existing = stored.clone();
        Ok(Some(stored))
    }

    async fn soft_delete<E: Record>(
        &self,
        tx: &mut Self::Tx,
        id: DbId,
        actor: Option<DbId>,
        at: Timestamp,
    ) -> Result<Option<E>, DbError> {
        let Some(row) = find_live::<E>(&mut tx.tables, id) else {
            return Ok(None);
        };
        row.audit_mut().stamp_deleted(actor, at);
        let deleted = row.clone();
        apply_dependents(&mut tx.tables, E::KIND, E::dependents(), &[id], actor, at)?;
        Ok(Some(deleted))
    }

    async fn select<E: Record>(&self, query: &Query) -> Result<Vec<E>, DbError> {
        validate_query::<E>(query)?;
        let state = self.read()?;
        let mut rows: Vec<E> = state
            .tables
            .get(E::TABLE)
            .map(|rows| {
                rows.iter()
                    .filter(|row| !row.is_deleted())
                    .filter_map(|row| row.as_any().downcast_ref::<E>())
                    .filter(|row| {
                        query
                            .filters
                            .iter()
                            .all(|f| f.matches(row.value(f.field).as_ref()))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(state);

        if !query.sorts.is_empty() {
            rows.sort_by(|a, b| {
                query
                    .sorts
                    .iter()
                    .map(|s| s.compare(a.value(s.field).as_ref(), b.value(s.field).as_ref()))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(rows)
    }

    async fn enqueue(&self, tx: &mut Self::Tx, event: &OutboxEvent) -> Result<(), DbError> {
        tx.outbox.push(event.clone());
        Ok(())
    }

    async fn pending_events(&self, limit: i64) -> Result<Vec<OutboxEvent>, DbError> {
        let state = self.read()?;
        let mut pending: Vec<_> = state
            .outbox
            .iter()
            .filter(|event| !event.is_dispatched())
            .cloned()
            .collect();
        pending.sort_by_key(|event| event.created_at);
        pending.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(pending)
    }

    async fn mark_dispatched(&self, ids: &[DbId], at: Timestamp) -> Result<(), DbError> {
        let mut state = self.write()?;
        for event in state.outbox.iter_mut().filter(|e| ids.contains(&e.id)) {
            event.dispatched_at = Some(at);
        }
        Ok(())
    }
}
