//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans every [`EntityEvent`] out to all subscribers. A
//! [`TopicSubscription`] narrows that down to events carrying one topic,
//! e.g. `member_profile.update.branch.<id>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use coop_core::topics::has_topic;

// ---------------------------------------------------------------------------
// EntityEvent
// ---------------------------------------------------------------------------

/// One entity mutation as seen by subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEvent {
    /// Every topic the mutation was published on, most general first.
    pub topics: Vec<String>,

    /// The entity's response DTO at the time of the write.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl EntityEvent {
    pub fn new(topics: Vec<String>, payload: serde_json::Value) -> Self {
        Self {
            topics,
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        has_topic(&self.topics, topic)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Share it as `Arc<EventBus>`. Slow receivers that fall more than the
/// channel capacity behind observe `RecvError::Lagged`.
pub struct EventBus {
    sender: broadcast::Sender<EntityEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Returns how many received it;
    /// zero subscribers is not an error.
    pub fn publish(&self, event: EntityEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Every event published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<EntityEvent> {
        self.sender.subscribe()
    }

    /// Only events published on `topic`.
    pub fn subscribe_topic(&self, topic: impl Into<String>) -> TopicSubscription {
        TopicSubscription {
            topic: topic.into(),
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A receiver that skips events not carrying its topic.
pub struct TopicSubscription {
    topic: String,
    receiver: broadcast::Receiver<EntityEvent>,
}

impl TopicSubscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next matching event.
    pub async fn recv(&mut self) -> Result<EntityEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if event.has_topic(&self.topic) {
                return Ok(event);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn event(topics: &[&str]) -> EntityEvent {
        EntityEvent::new(
            topics.iter().map(|t| t.to_string()).collect(),
            serde_json::json!({"name": "Regular"}),
        )
    }

    #[tokio::test]
    async fn every_subscriber_receives_each_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.publish(event(&["member_type.create"])), 2);

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");
        assert_eq!(e1.topics, vec!["member_type.create"]);
        assert_eq!(e2.payload["name"], "Regular");
    }

    #[tokio::test]
    async fn topic_subscription_skips_other_topics() {
        let bus = EventBus::default();
        let mut branch = bus.subscribe_topic("member_type.create.branch.b1");

        bus.publish(event(&["member_type.create", "member_type.create.branch.b2"]));
        bus.publish(event(&["member_type.create", "member_type.create.branch.b1"]));

        let received = branch.recv().await.expect("should receive the b1 event");
        assert!(received.has_topic("member_type.create.branch.b1"));
        assert_eq!(branch.topic(), "member_type.create.branch.b1");
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.publish(event(&["loan_tag.delete"])), 0);
    }

    #[tokio::test]
    async fn lagging_receivers_are_told() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for _ in 0..4 {
            bus.publish(event(&["loan_tag.update"]));
        }
        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
    }
}
