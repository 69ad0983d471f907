//! Batched relation loading shared by every [`Record::preload`] impl.
//!
//! Each helper issues one query for the whole slice of rows, then hands the
//! remaining dot-path segments to the related type so nested paths like
//! `loan_transaction.member_profile` load level by level.

use std::collections::HashMap;

use coop_core::filter::{FilterSql, Query, SortSpec};
use coop_core::types::DbId;

use crate::error::DbError;
use crate::record::Record;
use crate::store::Store;

/// Split `a.b.c` into `("a", Some("b.c"))`.
pub fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

pub fn unknown_relation<T: Record>(path: &str) -> DbError {
    DbError::UnknownRelation {
        entity: T::KIND,
        relation: path.to_string(),
    }
}

fn distinct_ids(ids: impl Iterator<Item = DbId>) -> Vec<DbId> {
    let mut ids: Vec<DbId> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Load the parent each row references through a nullable foreign key.
///
/// Rows whose key is `NULL` or points at a soft-deleted parent get `None`.
pub async fn belongs_to<S, T, P>(
    store: &S,
    rows: &mut [T],
    nested: Option<&str>,
    key: fn(&T) -> Option<DbId>,
    assign: fn(&mut T, Option<Box<P>>),
) -> Result<(), DbError>
where
    S: Store,
    T: Record,
    P: Record,
{
    let ids = distinct_ids(rows.iter().filter_map(|row| key(row)));
    let mut parents: Vec<P> = if ids.is_empty() {
        Vec::new()
    } else {
        store
            .select(&Query::new().filter(FilterSql::any_of("id", ids)))
            .await?
    };
    if let Some(nested) = nested {
        P::preload(store, &mut parents, nested).await?;
    }

    let by_id: HashMap<DbId, P> = parents.into_iter().map(|p| (p.id(), p)).collect();
    for row in rows.iter_mut() {
        let parent = key(row).and_then(|id| by_id.get(&id)).cloned().map(Box::new);
        assign(row, parent);
    }
    Ok(())
}

/// Load the live children referencing each row through `foreign_key`,
/// oldest first.
pub async fn has_many<S, T, C>(
    store: &S,
    rows: &mut [T],
    nested: Option<&str>,
    foreign_key: &'static str,
    parent_of: fn(&C) -> Option<DbId>,
    assign: fn(&mut T, Vec<C>),
) -> Result<(), DbError>
where
    S: Store,
    T: Record,
    C: Record,
{
    if rows.is_empty() {
        return Ok(());
    }
    let ids = distinct_ids(rows.iter().map(Record::id));
    let query = Query::new()
        .filter(FilterSql::any_of(foreign_key, ids))
        .sort(SortSpec::asc("created_at"));
    let mut children: Vec<C> = store.select(&query).await?;
    if let Some(nested) = nested {
        C::preload(store, &mut children, nested).await?;
    }

    let mut grouped: HashMap<DbId, Vec<C>> = HashMap::new();
    for child in children {
        if let Some(parent_id) = parent_of(&child) {
            grouped.entry(parent_id).or_default().push(child);
        }
    }
    for row in rows.iter_mut() {
        let children = grouped.remove(&row.id()).unwrap_or_default();
        assign(row, children);
    }
    Ok(())
}
