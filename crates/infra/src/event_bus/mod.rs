//! Infrastructure event bus implementations and the inventory event publisher.
//!
//! The core event bus abstraction lives in `stockledger-events` as pure mechanics.
//! This module erases the bus error type (`JsonBus`) so services and the
//! coordinator can share one `Arc<dyn JsonBus>` regardless of transport.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use stockledger_events::{
    Event, EventBus, EventEnvelope, InMemoryEventBus, InventoryEvent, Subscription, TopicFilter,
};

use crate::metrics::InventoryMetrics;

#[cfg(feature = "redis")]
pub mod redis_streams;

#[cfg(feature = "redis")]
pub use redis_streams::{RedisStreamsError, RedisStreamsEventBus};

pub type JsonEnvelope = EventEnvelope<JsonValue>;

/// Object-safe view of an `EventBus<JsonEnvelope>`.
pub trait JsonBus: Send + Sync {
    fn publish_envelope(&self, envelope: JsonEnvelope) -> Result<(), String>;

    fn subscribe_topics(&self, topics: TopicFilter) -> Subscription<JsonEnvelope>;
}

impl<B> JsonBus for B
where
    B: EventBus<JsonEnvelope>,
{
    fn publish_envelope(&self, envelope: JsonEnvelope) -> Result<(), String> {
        self.publish(envelope).map_err(|e| format!("{e:?}"))
    }

    fn subscribe_topics(&self, topics: TopicFilter) -> Subscription<JsonEnvelope> {
        self.subscribe(topics)
    }
}

/// Publishes inventory events after their mutation has committed.
///
/// Publication is best-effort: failures are logged and counted, never returned.
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn JsonBus>,
    metrics: InventoryMetrics,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn JsonBus>, metrics: InventoryMetrics) -> Self {
        Self { bus, metrics }
    }

    /// Publisher over a fresh in-memory bus, returned alongside it.
    pub fn in_memory() -> (Self, Arc<InMemoryEventBus<JsonEnvelope>>) {
        let bus = Arc::new(InMemoryEventBus::new());
        (Self::new(bus.clone(), InventoryMetrics::new()), bus)
    }

    pub fn bus(&self) -> &Arc<dyn JsonBus> {
        &self.bus
    }

    pub fn publish(&self, event: InventoryEvent) {
        let topic = event.topic();
        let envelope = match EventEnvelope::from_event(&event, Utc::now()) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(topic, error = %err, "failed to encode inventory event");
                self.metrics.publish_failed(topic);
                return;
            }
        };

        match self.bus.publish_envelope(envelope) {
            Ok(()) => debug!(topic, key = %event.partition_key(), "published inventory event"),
            Err(err) => {
                warn!(topic, error = %err, "failed to publish inventory event");
                self.metrics.publish_failed(topic);
            }
        }
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_core::{ProductId, TenantId, WarehouseId};
    use stockledger_events::{inventory, StockUpdated};

    #[test]
    fn published_events_reach_matching_subscribers() {
        let (publisher, bus) = EventPublisher::in_memory();
        let mut updates = bus.subscribe(TopicFilter::only([inventory::STOCK_UPDATED]));
        let mut reservations = bus.subscribe(TopicFilter::only([inventory::RESERVED]));

        publisher.publish(InventoryEvent::StockUpdated(StockUpdated {
            tenant_id: TenantId::parse("t1").unwrap(),
            product_id: ProductId::parse("sku-1").unwrap(),
            warehouse_id: WarehouseId::parse("w1").unwrap(),
            delta: 5,
            quantity: 5,
            available: 5,
        }));

        let envelope = updates.try_recv().unwrap();
        assert_eq!(envelope.topic(), inventory::STOCK_UPDATED);
        assert_eq!(envelope.tenant_id().as_str(), "t1");
        assert_eq!(envelope.payload()["productId"], "sku-1");
        assert_eq!(envelope.payload()["quantity"], 5);
        assert!(reservations.try_recv().is_err());
    }
}
