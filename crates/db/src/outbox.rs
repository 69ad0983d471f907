//! Change events written in the same transaction as the row they describe.
//!
//! The relay in `coop-events` drains undispatched rows and publishes them,
//! so an event exists if and only if its write committed.

use serde::Serialize;
use sqlx::FromRow;

use coop_core::topics::Action;
use coop_core::types::{new_id, DbId, Timestamp};

/// Column list for `outbox_events` queries.
pub const OUTBOX_COLUMNS: &str =
    "id, entity_kind, entity_id, action, topics, payload, created_at, dispatched_at";

/// A row from the `outbox_events` table.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct OutboxEvent {
    pub id: DbId,
    pub entity_kind: String,
    pub entity_id: DbId,
    pub action: String,
    pub topics: Vec<String>,
    /// The entity's response DTO at the time of the write.
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub dispatched_at: Option<Timestamp>,
}

impl OutboxEvent {
    pub fn new(
        entity_kind: &str,
        action: Action,
        entity_id: DbId,
        topics: Vec<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: new_id(),
            entity_kind: entity_kind.to_string(),
            entity_id,
            action: action.as_str().to_string(),
            topics,
            payload,
            created_at: chrono::Utc::now(),
            dispatched_at: None,
        }
    }

    pub fn is_dispatched(&self) -> bool {
        self.dispatched_at.is_some()
    }
}
