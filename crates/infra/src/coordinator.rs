//! Event-driven reservation coordinator.
//!
//! Subscribes to the order lifecycle topics and drives the reservation
//! service:
//!
//! - `order.created` reserves every line (grouped by warehouse); each line that
//!   cannot be reserved publishes `inventory.out_of_stock` keyed by the order
//! - `order.cancelled` / `payment.failed` release every line held by the order
//!
//! One bad message never stops the loop: decode failures, missing records and
//! store errors are logged and the message is dropped. Redelivered messages are
//! harmless because reservations are keyed by order.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use stockledger_core::{TenantId, WarehouseId};
use stockledger_events::{
    order, EventDecodeError, InventoryEvent, OrderLifecycleEvent, OrderLine, OrderPayload,
    OutOfStock, Subscription, TopicFilter,
};
use stockledger_inventory::{ReservationItem, WarehouseItem};

use crate::config::{CoordinatorConfig, InventorySettings};
use crate::event_bus::{EventPublisher, JsonBus, JsonEnvelope};
use crate::services::{ReservationService, ServiceContext, ServiceError};

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Decode(#[from] EventDecodeError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Handle to stop a running coordinator.
#[derive(Debug)]
pub struct CoordinatorHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Request shutdown and wait for the loop to finish its current message.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.join.await;
    }
}

#[derive(Clone)]
pub struct ReservationCoordinator {
    reservations: ReservationService,
    publisher: EventPublisher,
    default_tenant: TenantId,
    default_warehouse: WarehouseId,
    message_timeout: Duration,
}

impl ReservationCoordinator {
    pub fn new(
        ctx: &ServiceContext,
        settings: &InventorySettings,
        config: &CoordinatorConfig,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            reservations: ReservationService::new(ctx.clone()),
            publisher: ctx.publisher.clone(),
            default_tenant: TenantId::parse(&settings.default_tenant)?,
            default_warehouse: ctx.default_warehouse.clone(),
            message_timeout: config.message_timeout(),
        })
    }

    /// Subscribe to the order lifecycle topics of `bus` and process them on a task.
    pub fn spawn(self, bus: &dyn JsonBus) -> CoordinatorHandle {
        let subscription = bus.subscribe_topics(TopicFilter::only(order::TOPICS));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = tokio::spawn(self.run(subscription, shutdown_rx));

        CoordinatorHandle {
            shutdown: Some(shutdown_tx),
            join,
        }
    }

    async fn run(
        self,
        mut subscription: Subscription<JsonEnvelope>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        info!(topics = ?order::TOPICS, "reservation coordinator started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                message = subscription.recv() => match message {
                    Some(envelope) => self.process(envelope).await,
                    None => break,
                },
            }
        }
        info!("reservation coordinator stopped");
    }

    async fn process(&self, envelope: JsonEnvelope) {
        let topic = envelope.topic();
        match tokio::time::timeout(self.message_timeout, self.handle(&envelope)).await {
            Ok(Ok(())) => debug!(topic, key = envelope.key(), "order event processed"),
            Ok(Err(CoordinatorError::Decode(EventDecodeError::UnsupportedTopic(_)))) => {
                debug!(topic, "ignoring unsupported topic");
            }
            Ok(Err(CoordinatorError::Decode(err))) => {
                warn!(topic, event_id = %envelope.event_id(), error = %err, "dropping undecodable order event");
            }
            Ok(Err(err)) => {
                error!(topic, event_id = %envelope.event_id(), error = %err, "order event handler failed; dropped");
            }
            Err(_) => {
                error!(topic, event_id = %envelope.event_id(), timeout_ms = self.message_timeout.as_millis() as u64, "order event timed out; dropped");
            }
        }
    }

    /// Apply one lifecycle message.
    pub async fn handle(&self, envelope: &JsonEnvelope) -> Result<(), CoordinatorError> {
        match OrderLifecycleEvent::decode(envelope.topic(), envelope.payload())? {
            OrderLifecycleEvent::Created(order) => self.on_created(&order).await,
            OrderLifecycleEvent::Cancelled(order) | OrderLifecycleEvent::PaymentFailed(order) => {
                self.on_released(&order).await
            }
        }
    }

    fn warehouse_for(&self, order: &OrderPayload, line: &OrderLine) -> WarehouseId {
        line.warehouse_id
            .clone()
            .or_else(|| order.warehouse_id.clone())
            .unwrap_or_else(|| self.default_warehouse.clone())
    }

    async fn on_created(&self, order: &OrderPayload) -> Result<(), CoordinatorError> {
        let tenant_id = order.tenant_or(&self.default_tenant);

        let mut by_warehouse: BTreeMap<WarehouseId, Vec<ReservationItem>> = BTreeMap::new();
        for line in &order.items {
            by_warehouse
                .entry(self.warehouse_for(order, line))
                .or_default()
                .push(ReservationItem {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                });
        }

        for (warehouse_id, items) in by_warehouse {
            let result = self
                .reservations
                .reserve_from_warehouse(&tenant_id, &warehouse_id, &items, &order.id)
                .await?;

            for failed in result.failed {
                self.publisher
                    .publish(InventoryEvent::OutOfStock(OutOfStock {
                        tenant_id: tenant_id.clone(),
                        product_id: failed.product_id,
                        warehouse_id: Some(warehouse_id.clone()),
                        order_id: Some(order.id.clone()),
                        requested: Some(failed.requested),
                        available: failed.available,
                        alert_id: None,
                    }));
            }
        }
        Ok(())
    }

    async fn on_released(&self, order: &OrderPayload) -> Result<(), CoordinatorError> {
        let tenant_id = order.tenant_or(&self.default_tenant);
        let items: Vec<WarehouseItem> = order
            .items
            .iter()
            .map(|line| WarehouseItem {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                warehouse_id: self.warehouse_for(order, line),
            })
            .collect();

        let result = self
            .reservations
            .release_reservation(&tenant_id, &items, Some(&order.id))
            .await?;
        if !result.failed.is_empty() {
            warn!(order_id = %order.id, failed = result.failed.len(), "some order lines had no stock record to release");
        }
        Ok(())
    }
}
