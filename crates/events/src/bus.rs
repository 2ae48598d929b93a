//! Event publishing/subscription abstraction (mechanics only).
//!
//! This module provides the **event bus pattern** - a pub/sub mechanism for distributing
//! messages between the inventory core and its collaborators (order service, alerting).
//!
//! ## Design Philosophy
//!
//! The event bus is intentionally **lightweight** and makes minimal assumptions:
//!
//! - **Transport-agnostic**: Works with in-memory channels, Redis Streams, Kafka-like brokers
//! - **At-least-once delivery**: Messages may be delivered multiple times; consumers must be idempotent
//! - **Per-key ordering only**: Messages with different partition keys may arrive in any order
//! - **Topic routing**: Subscribers declare which topics they care about
//!
//! Consumers must be idempotent - processing the same message multiple times should produce
//! the same result (or be a no-op).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

/// A message that carries its routing topic.
pub trait Routable {
    fn topic(&self) -> &str;
}

/// Topics a subscription wants to receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicFilter {
    All,
    Only(Vec<String>),
}

impl TopicFilter {
    pub fn only<I, T>(topics: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::Only(topics.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self {
            TopicFilter::All => true,
            TopicFilter::Only(topics) => topics.iter().any(|t| t == topic),
        }
    }

    /// Concrete topic names (empty for `All`).
    pub fn topics(&self) -> &[String] {
        match self {
            TopicFilter::All => &[],
            TopicFilter::Only(topics) => topics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvTimeoutError {
    /// No message arrived within the timeout.
    Timeout,
    /// The bus side of the subscription is gone.
    Disconnected,
}

/// A subscription to an event stream.
///
/// Each subscription gets a copy of every published message that matches its
/// topic filter (broadcast semantics). Designed for a single consuming task.
///
/// ## Usage Pattern
///
/// ```ignore
/// let mut subscription = bus.subscribe(TopicFilter::only(["order.created"]));
///
/// loop {
///     match subscription.recv_timeout(Duration::from_secs(1)).await {
///         Ok(msg) => process(msg).await,
///         Err(RecvTimeoutError::Timeout) => continue, // check for shutdown
///         Err(RecvTimeoutError::Disconnected) => break,
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: mpsc::UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: mpsc::UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Create a connected sender/subscription pair (used by bus implementations).
    pub fn channel() -> (mpsc::UnboundedSender<M>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    /// Wait for the next message; `None` once the bus side is closed.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Wait for up to `timeout` for a message.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        match tokio::time::timeout(timeout, self.receiver.recv()).await {
            Ok(Some(msg)) => Ok(msg),
            Ok(None) => Err(RecvTimeoutError::Disconnected),
            Err(_) => Err(RecvTimeoutError::Timeout),
        }
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// ## Architecture Role
///
/// ```text
/// Store mutation commits → EventPublisher → Event Bus → Consumers
///                                                        ├─ Order service
///                                                        └─ Alerting
/// Order service → Event Bus → Reservation Coordinator → Reservation Service
/// ```
///
/// Publication happens **after** the store mutation commits. A crash in between leaves a
/// mutated-but-unpublished state, never a published-but-unmutated one.
///
/// ## Error Handling
///
/// `publish()` can fail (e.g., network error). Callers in this workspace log and count the
/// failure; the mutation that produced the event has already committed.
///
/// ## Thread Safety
///
/// The trait requires `Send + Sync`; many tasks publish concurrently.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self, topics: TopicFilter) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self, topics: TopicFilter) -> Subscription<M> {
        (**self).subscribe(topics)
    }
}
