//! The broker seam between the outbox relay and whatever delivers events.

use std::sync::Arc;

use async_trait::async_trait;

use crate::bus::{EntityEvent, EventBus};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The broker is gone; the event stays in the outbox for a later run.
    #[error("Broker unavailable: {0}")]
    Unavailable(String),
}

/// Publishes one event on all of its topics.
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    async fn dispatch(&self, topics: &[String], payload: &serde_json::Value) -> Result<(), DispatchError>;
}

#[async_trait]
impl Dispatch for EventBus {
    async fn dispatch(&self, topics: &[String], payload: &serde_json::Value) -> Result<(), DispatchError> {
        let receivers = self.publish(EntityEvent::new(topics.to_vec(), payload.clone()));
        tracing::trace!(topics = topics.len(), receivers, "Published on event bus");
        Ok(())
    }
}

#[async_trait]
impl<D: Dispatch> Dispatch for Arc<D> {
    async fn dispatch(&self, topics: &[String], payload: &serde_json::Value) -> Result<(), DispatchError> {
        (**self).dispatch(topics, payload).await
    }
}
