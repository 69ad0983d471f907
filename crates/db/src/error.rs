use std::time::Duration;

use coop_core::error::CoreError;
use coop_core::types::DbId;

/// Errors raised by the registry and its stores.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A database error from sqlx, propagated unchanged.
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A domain rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A response payload could not be encoded for the outbox.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("No {entity} matches the query")]
    NoMatch { entity: &'static str },

    /// A `RESTRICT` relation blocks the soft delete.
    #[error("Cannot delete {entity}: {dependent} rows still reference it")]
    Restricted {
        entity: &'static str,
        dependent: &'static str,
    },

    #[error("Duplicate {entity} id {id}")]
    DuplicateKey { entity: &'static str, id: DbId },

    #[error("Unknown column '{column}' on {entity}")]
    UnknownColumn { entity: &'static str, column: String },

    #[error("Unknown relation '{relation}' on {entity}")]
    UnknownRelation { entity: &'static str, relation: String },

    #[error("Query on {entity} exceeded {timeout:?}")]
    Timeout {
        entity: &'static str,
        timeout: Duration,
    },

    /// Another transaction committed first; the caller should retry.
    #[error("Concurrent write conflict")]
    WriteConflict,

    /// A seed row failed; the whole seed transaction must be abandoned.
    #[error("Failed to seed {item}: {source}")]
    Seed {
        item: String,
        #[source]
        source: Box<DbError>,
    },

    #[error("Internal store error: {0}")]
    Internal(String),
}
