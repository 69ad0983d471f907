//! PostgreSQL store built on `sqlx::QueryBuilder`.
//!
//! Table and column names come from [`Record`] constants and are validated
//! against them before any SQL is built; only values are bound.

use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::{PgConnection, Postgres, QueryBuilder, Transaction};

use coop_core::filter::{FilterOp, FilterSql, Query, SortOrder, Value};
use coop_core::types::{DbId, Timestamp};

use crate::error::DbError;
use crate::outbox::{OutboxEvent, OUTBOX_COLUMNS};
use crate::record::{Dependent, OnDelete, Record, AUDIT_COLUMNS};
use crate::store::{validate_query, Store};
use crate::DbPool;

/// Store backed by a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// SQL builders
// ---------------------------------------------------------------------------

fn select_list<E: Record>() -> String {
    AUDIT_COLUMNS
        .iter()
        .chain(E::COLUMNS.iter())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_value(builder: &mut QueryBuilder<'static, Postgres>, value: Value) {
    match value {
        Value::Uuid(v) => builder.push_bind(v),
        Value::Text(v) => builder.push_bind(v),
        Value::Float(v) => builder.push_bind(v),
        Value::Int(v) => builder.push_bind(v),
        Value::Bool(v) => builder.push_bind(v),
        Value::Timestamp(v) => builder.push_bind(v),
        Value::UuidList(v) => builder.push_bind(v),
    };
}

fn sql_operator(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Ne => "<>",
        FilterOp::Lt => "<",
        FilterOp::Lte => "<=",
        FilterOp::Gt => ">",
        FilterOp::Gte => ">=",
        FilterOp::Like => "ILIKE",
        FilterOp::IsNull => "IS NULL",
        FilterOp::NotNull => "IS NOT NULL",
        FilterOp::In => "= ANY",
    }
}

fn push_filter(builder: &mut QueryBuilder<'static, Postgres>, filter: &FilterSql) {
    builder.push(filter.field);
    builder.push(" ");
    builder.push(sql_operator(filter.op));
    match filter.op {
        FilterOp::IsNull | FilterOp::NotNull => {}
        FilterOp::In => {
            builder.push("(");
            push_value(builder, filter.value.clone());
            builder.push(")");
        }
        _ => {
            builder.push(" ");
            push_value(builder, filter.value.clone());
        }
    }
}

pub(crate) fn build_select<E: Record>(query: &Query) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {} FROM {} WHERE deleted_at IS NULL",
        select_list::<E>(),
        E::TABLE
    ));
    for filter in &query.filters {
        builder.push(" AND ");
        push_filter(&mut builder, filter);
    }
    if !query.sorts.is_empty() {
        let order = query
            .sorts
            .iter()
            .map(|s| match s.order {
                SortOrder::Asc => format!("{} ASC", s.field),
                SortOrder::Desc => format!("{} DESC", s.field),
            })
            .collect::<Vec<_>>()
            .join(", ");
        builder.push(" ORDER BY ");
        builder.push(order);
    }
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
    builder
}

pub(crate) fn build_insert<E: Record>(row: &E) -> QueryBuilder<'static, Postgres> {
    let values: Vec<_> = row.audit().values().into_iter().chain(row.values()).collect();
    let names = values.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ");

    let mut builder = QueryBuilder::new(format!("INSERT INTO {} ({names}) VALUES (", E::TABLE));
    for (i, (_, value)) in values.into_iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        push_value(&mut builder, value);
    }
    builder.push(") RETURNING ");
    builder.push(select_list::<E>());
    builder
}

pub(crate) fn build_update<E: Record>(row: &E) -> QueryBuilder<'static, Postgres> {
    let audit = row.audit();
    let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", E::TABLE));
    for (name, value) in row.values() {
        builder.push(name);
        builder.push(" = ");
        push_value(&mut builder, value);
        builder.push(", ");
    }
    builder.push("updated_at = ");
    builder.push_bind(audit.updated_at);
    builder.push(", updated_by_id = ");
    builder.push_bind(audit.updated_by_id);
    builder.push(" WHERE id = ");
    builder.push_bind(audit.id);
    builder.push(" AND deleted_at IS NULL RETURNING ");
    builder.push(select_list::<E>());
    builder
}

fn build_soft_delete<E: Record>(
    id: DbId,
    actor: Option<DbId>,
    at: Timestamp,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("UPDATE {} SET deleted_at = ", E::TABLE));
    builder.push_bind(at);
    builder.push(", deleted_by_id = ");
    builder.push_bind(actor);
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND deleted_at IS NULL RETURNING ");
    builder.push(select_list::<E>());
    builder
}

/// Apply delete policies to the rows referencing `ids`, depth first.
fn apply_dependents<'c>(
    conn: &'c mut PgConnection,
    parent: &'static str,
    dependents: Vec<Dependent>,
    ids: Vec<DbId>,
    actor: Option<DbId>,
    at: Timestamp,
) -> BoxFuture<'c, Result<(), DbError>> {
    Box::pin(async move {
        if ids.is_empty() {
            return Ok(());
        }

        for dep in dependents.iter().filter(|d| d.on_delete == OnDelete::Restrict) {
            let sql = format!(
                "SELECT EXISTS (SELECT 1 FROM {} WHERE {} = ANY($1) AND deleted_at IS NULL)",
                dep.table, dep.column
            );
            let exists: bool = sqlx::query_scalar(&sql)
                .bind(&ids)
                .fetch_one(&mut *conn)
                .await?;
            if exists {
                return Err(DbError::Restricted {
                    entity: parent,
                    dependent: dep.kind,
                });
            }
        }

        for dep in &dependents {
            match dep.on_delete {
                OnDelete::Restrict => {}
                OnDelete::SetNull => {
                    let sql = format!(
                        "UPDATE {table} SET {column} = NULL, updated_at = $1 \
                         WHERE {column} = ANY($2) AND deleted_at IS NULL",
                        table = dep.table,
                        column = dep.column
                    );
                    let result = sqlx::query(&sql)
                        .bind(at)
                        .bind(&ids)
                        .execute(&mut *conn)
                        .await?;
                    tracing::debug!(table = dep.table, rows = result.rows_affected(), "Detached dependents");
                }
                OnDelete::Cascade => {
                    let sql = format!(
                        "SELECT id FROM {} WHERE {} = ANY($1) AND deleted_at IS NULL",
                        dep.table, dep.column
                    );
                    let child_ids: Vec<DbId> = sqlx::query_scalar(&sql)
                        .bind(&ids)
                        .fetch_all(&mut *conn)
                        .await?;
                    if child_ids.is_empty() {
                        continue;
                    }
                    apply_dependents(&mut *conn, dep.kind, (dep.dependents)(), child_ids.clone(), actor, at)
                        .await?;
                    let sql = format!(
                        "UPDATE {} SET deleted_at = $1, deleted_by_id = $2 WHERE id = ANY($3)",
                        dep.table
                    );
                    sqlx::query(&sql)
                        .bind(at)
                        .bind(actor)
                        .bind(&child_ids)
                        .execute(&mut *conn)
                        .await?;
                    tracing::debug!(table = dep.table, rows = child_ids.len(), "Cascaded soft delete");
                }
            }
        }
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[async_trait]
impl Store for PgStore {
    type Tx = Transaction<'static, Postgres>;

    async fn begin(&self) -> Result<Self::Tx, DbError> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(&self, tx: Self::Tx) -> Result<(), DbError> {
        tx.commit().await?;
        Ok(())
    }

    async fn insert<E: Record>(&self, tx: &mut Self::Tx, row: &E) -> Result<E, DbError> {
        let mut builder = build_insert(row);
        let stored = builder.build_query_as::<E>().fetch_one(&mut **tx).await?;
        Ok(stored)
    }

    async fn update<E: Record>(&self, tx: &mut Self::Tx, row: &E) -> Result<Option<E>, DbError> {
        let mut builder = build_update(row);
        let stored = builder
            .build_query_as::<E>()
            .fetch_optional(&mut **tx)
            .await?;
        Ok(stored)
    }

    async fn soft_delete<E: Record>(
        &self,
        tx: &mut Self::Tx,
        id: DbId,
        actor: Option<DbId>,
        at: Timestamp,
    ) -> Result<Option<E>, DbError> {
        let mut builder = build_soft_delete::<E>(id, actor, at);
        let Some(deleted) = builder
            .build_query_as::<E>()
            .fetch_optional(&mut **tx)
            .await?
        else {
            return Ok(None);
        };
        apply_dependents(&mut **tx, E::KIND, E::dependents(), vec![id], actor, at).await?;
        Ok(Some(deleted))
    }

    async fn select<E: Record>(&self, query: &Query) -> Result<Vec<E>, DbError> {
        validate_query::<E>(query)?;
        let mut builder = build_select::<E>(query);
        let rows = builder.build_query_as::<E>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn enqueue(&self, tx: &mut Self::Tx, event: &OutboxEvent) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO outbox_events
                (id, entity_kind, entity_id, action, topics, payload, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(event.id)
        .bind(&event.entity_kind)
        .bind(event.entity_id)
        .bind(&event.action)
        .bind(&event.topics)
        .bind(&event.payload)
        .bind(event.created_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn pending_events(&self, limit: i64) -> Result<Vec<OutboxEvent>, DbError> {
        let query = format!(
            "SELECT {OUTBOX_COLUMNS} FROM outbox_events
             WHERE dispatched_at IS NULL
             ORDER BY created_at ASC
             LIMIT $1"
        );
        let events = sqlx::query_as::<_, OutboxEvent>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(events)
    }

    async fn mark_dispatched(&self, ids: &[DbId], at: Timestamp) -> Result<(), DbError> {
        sqlx::query("UPDATE outbox_events SET dispatched_at = $1 WHERE id = ANY($2)")
            .bind(at)
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
