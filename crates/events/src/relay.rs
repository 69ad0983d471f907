//! Outbox relay.
//!
//! [`OutboxRelay`] runs as a background task, periodically reading committed
//! outbox rows oldest first, publishing each through a [`Dispatch`] and
//! marking the published ones as dispatched. Delivery is at-least-once: a
//! crash between publishing and marking replays the event on the next run.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use coop_db::{DbError, Store};

use crate::dispatch::Dispatch;

/// Rows read per poll unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: i64 = 100;

/// Poll period unless configured otherwise.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

pub struct OutboxRelay<S, D> {
    store: S,
    dispatcher: D,
    batch_size: i64,
    interval: Duration,
}

impl<S: Store, D: Dispatch> OutboxRelay<S, D> {
    pub fn new(store: S, dispatcher: D) -> Self {
        Self {
            store,
            dispatcher,
            batch_size: DEFAULT_BATCH_SIZE,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the relay loop until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Outbox relay cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.drain().await {
                        tracing::error!(error = %e, "Failed to relay outbox events");
                    }
                }
            }
        }
    }

    /// Relay full batches back to back until the outbox is empty or a
    /// dispatch fails.
    async fn drain(&self) -> Result<(), DbError> {
        loop {
            let relayed = self.relay_once().await?;
            if relayed < self.batch_size as usize {
                return Ok(());
            }
        }
    }

    /// Relay one batch. Returns how many events were published.
    ///
    /// Stops at the first failed dispatch so events are never published out
    /// of order; the failed event and everything after it stay pending.
    pub async fn relay_once(&self) -> Result<usize, DbError> {
        let pending = self.store.pending_events(self.batch_size).await?;
        if pending.is_empty() {
            return Ok(0);
        }

        let mut dispatched = Vec::with_capacity(pending.len());
        for event in &pending {
            match self.dispatcher.dispatch(&event.topics, &event.payload).await {
                Ok(()) => dispatched.push(event.id),
                Err(e) => {
                    tracing::warn!(
                        event_id = %event.id,
                        entity = %event.entity_kind,
                        entity_id = %event.entity_id,
                        error = %e,
                        "Dispatch failed, will retry"
                    );
                    break;
                }
            }
        }

        if !dispatched.is_empty() {
            self.store.mark_dispatched(&dispatched, Utc::now()).await?;
            tracing::debug!(count = dispatched.len(), "Relayed outbox events");
        }
        Ok(dispatched.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use uuid::Uuid;

    use coop_core::tenant::{TenantScope, UserContext};
    use coop_db::models::member_type::MemberType;
    use coop_db::repositories::member_type_registry;
    use coop_db::MemoryStore;

    use super::*;
    use crate::bus::EventBus;
    use crate::dispatch::DispatchError;

    fn user() -> UserContext {
        UserContext::new(Uuid::new_v4(), TenantScope::new(Uuid::new_v4(), Uuid::new_v4()))
    }

    async fn seed_events(store: &MemoryStore, user: &UserContext, names: &[&str]) {
        let repo = member_type_registry(store.clone());
        for name in names {
            repo.create(user.user_id, MemberType::new(user.tenant(), name, name, None))
                .await
                .unwrap();
        }
    }

    /// Accepts the first `accept` events, then refuses everything.
    struct Flaky {
        accept: usize,
        seen: AtomicUsize,
    }

    #[async_trait]
    impl Dispatch for Flaky {
        async fn dispatch(&self, _topics: &[String], _payload: &serde_json::Value) -> Result<(), DispatchError> {
            if self.seen.fetch_add(1, Ordering::SeqCst) < self.accept {
                Ok(())
            } else {
                Err(DispatchError::Unavailable("broker down".into()))
            }
        }
    }

    #[tokio::test]
    async fn relays_committed_events_to_topic_subscribers() {
        let store = MemoryStore::new();
        let user = user();
        let bus = Arc::new(EventBus::default());
        let mut branch_feed = bus.subscribe_topic(format!("member_type.create.branch.{}", user.branch_id));
        seed_events(&store, &user, &["REG", "ASC"]).await;

        let relay = OutboxRelay::new(store.clone(), bus.clone());
        assert_eq!(relay.relay_once().await.unwrap(), 2);

        let first = branch_feed.recv().await.unwrap();
        assert_eq!(first.payload["prefix"], "REG");
        let second = branch_feed.recv().await.unwrap();
        assert_eq!(second.payload["prefix"], "ASC");

        assert!(store.pending_events(10).await.unwrap().is_empty());
        assert_eq!(relay.relay_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_dispatch_leaves_the_rest_pending_in_order() {
        let store = MemoryStore::new();
        let user = user();
        seed_events(&store, &user, &["A", "B", "C"]).await;

        let relay = OutboxRelay::new(
            store.clone(),
            Flaky {
                accept: 1,
                seen: AtomicUsize::new(0),
            },
        );
        assert_eq!(relay.relay_once().await.unwrap(), 1);

        let pending = store.pending_events(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].payload["prefix"], "B");
    }

    #[tokio::test]
    async fn batch_size_bounds_each_pass() {
        let store = MemoryStore::new();
        let user = user();
        seed_events(&store, &user, &["A", "B", "C"]).await;

        let relay = OutboxRelay::new(store.clone(), EventBus::default()).with_batch_size(2);
        assert_eq!(relay.relay_once().await.unwrap(), 2);
        assert_eq!(relay.relay_once().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn run_stops_when_cancelled() {
        let store = MemoryStore::new();
        let user = user();
        seed_events(&store, &user, &["A"]).await;
        let relay = Arc::new(
            OutboxRelay::new(store.clone(), EventBus::default())
                .with_interval(Duration::from_millis(5)),
        );
        let cancel = CancellationToken::new();

        let task = tokio::spawn({
            let relay = relay.clone();
            let cancel = cancel.clone();
            async move { relay.run(cancel).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        task.await.unwrap();

        assert!(store.pending_events(10).await.unwrap().is_empty());
    }
}
