//! The persistence seam behind [`Registry`](crate::registry::Registry).
//!
//! A store knows how to move [`Record`] rows in and out of a backend inside
//! transactions. It knows nothing about topics, DTOs or validation.

use async_trait::async_trait;

use coop_core::filter::Query;
use coop_core::types::{DbId, Timestamp};

use crate::error::DbError;
use crate::outbox::OutboxEvent;
use crate::record::Record;

pub mod memory;
pub mod postgres;

#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// An open transaction. Dropping it without [`Store::commit`] discards
    /// every write made through it.
    type Tx: Send;

    async fn begin(&self) -> Result<Self::Tx, DbError>;

    async fn commit(&self, tx: Self::Tx) -> Result<(), DbError>;

    /// Insert a new row and return it as stored.
    async fn insert<E: Record>(&self, tx: &mut Self::Tx, row: &E) -> Result<E, DbError>;

    /// Overwrite the domain columns and update stamp of a live row.
    /// `None` when no live row has that id.
    async fn update<E: Record>(&self, tx: &mut Self::Tx, row: &E) -> Result<Option<E>, DbError>;

    /// Soft-delete a live row and apply the delete policy of its
    /// [`Record::dependents`]. `None` when no live row has that id.
    async fn soft_delete<E: Record>(
        &self,
        tx: &mut Self::Tx,
        id: DbId,
        actor: Option<DbId>,
        at: Timestamp,
    ) -> Result<Option<E>, DbError>;

    /// Committed live rows matching `query`.
    async fn select<E: Record>(&self, query: &Query) -> Result<Vec<E>, DbError>;

    async fn enqueue(&self, tx: &mut Self::Tx, event: &OutboxEvent) -> Result<(), DbError>;

    /// Oldest committed events not yet dispatched.
    async fn pending_events(&self, limit: i64) -> Result<Vec<OutboxEvent>, DbError>;

    async fn mark_dispatched(&self, ids: &[DbId], at: Timestamp) -> Result<(), DbError>;
}

/// Reject filters and sorts on columns the entity does not have.
pub(crate) fn validate_query<E: Record>(query: &Query) -> Result<(), DbError> {
    let fields = query
        .filters
        .iter()
        .map(|f| f.field)
        .chain(query.sorts.iter().map(|s| s.field));
    for field in fields {
        if !E::has_column(field) {
            return Err(DbError::UnknownColumn {
                entity: E::KIND,
                column: field.to_string(),
            });
        }
    }
    Ok(())
}
