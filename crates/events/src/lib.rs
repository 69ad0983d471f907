//! Change-event delivery.
//!
//! Registry writes leave their events in the outbox table. This crate moves
//! them out:
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, with per-topic subscriptions.
//! - [`Dispatch`]: the broker seam the relay publishes through.
//! - [`OutboxRelay`]: background task that drains committed outbox rows
//!   into a [`Dispatch`] implementation.

pub mod bus;
pub mod dispatch;
pub mod relay;

pub use bus::{EntityEvent, EventBus, TopicSubscription};
pub use dispatch::{Dispatch, DispatchError};
pub use relay::OutboxRelay;
