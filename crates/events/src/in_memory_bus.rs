//! In-memory event bus for tests/dev.

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::bus::{EventBus, Routable, Subscription, TopicFilter};

#[derive(Debug, thiserror::Error)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    #[error("in-memory bus lock poisoned")]
    Poisoned,
}

/// In-memory pub/sub bus.
///
/// - No IO
/// - Best-effort fan-out filtered by topic
/// - At-least-once acceptable (subscribers must be idempotent)
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<(TopicFilter, mpsc::UnboundedSender<M>)>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions (dead ones are pruned on publish).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Routable + Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self.subscribers.lock().map_err(|_| InMemoryBusError::Poisoned)?;

        // Drop any dead subscribers while publishing.
        subs.retain(|(filter, tx)| {
            if !filter.matches(message.topic()) {
                return !tx.is_closed();
            }
            tx.send(message.clone()).is_ok()
        });

        Ok(())
    }

    fn subscribe(&self, topics: TopicFilter) -> Subscription<M> {
        let (tx, subscription) = Subscription::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages until the process restarts.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push((topics, tx));
        }

        subscription
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::bus::RecvTimeoutError;

    #[derive(Debug, Clone, PartialEq)]
    struct Msg(&'static str, u32);

    impl Routable for Msg {
        fn topic(&self) -> &str {
            self.0
        }
    }

    #[tokio::test]
    async fn subscribers_only_receive_matching_topics() {
        let bus = InMemoryEventBus::new();
        let mut orders = bus.subscribe(TopicFilter::only(["order.created"]));
        let mut all = bus.subscribe(TopicFilter::All);

        bus.publish(Msg("inventory.reserved", 1)).unwrap();
        bus.publish(Msg("order.created", 2)).unwrap();

        assert_eq!(orders.recv().await, Some(Msg("order.created", 2)));
        assert_eq!(all.recv().await, Some(Msg("inventory.reserved", 1)));
        assert_eq!(all.recv().await, Some(Msg("order.created", 2)));
        assert_eq!(
            orders.recv_timeout(Duration::from_millis(20)).await,
            Err(RecvTimeoutError::Timeout)
        );
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_pruned() {
        let bus = InMemoryEventBus::new();
        let sub = bus.subscribe(TopicFilter::All);
        let _kept = bus.subscribe(TopicFilter::All);
        drop(sub);

        bus.publish(Msg("inventory.released", 3)).unwrap();
        assert_eq!(bus.subscriber_count(), 1);
    }
}
