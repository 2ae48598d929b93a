//! Best-effort low/out-of-stock alerting.
//!
//! Runs after a stock mutation has committed. At most one open alert exists per
//! (tenant, product, warehouse, type); alerts are only resolved explicitly.
//! Nothing here can fail the mutation that triggered it: store errors are logged.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use stockledger_core::AlertId;
use stockledger_events::{InventoryEvent, LowStock, OutOfStock};
use stockledger_inventory::{AlertTrigger, AlertType, StockAlert, StockRecord};

use crate::event_bus::EventPublisher;
use crate::metrics::InventoryMetrics;
use crate::store::AlertStore;

#[derive(Clone)]
pub struct Alerting {
    alerts: Arc<dyn AlertStore>,
    publisher: EventPublisher,
    metrics: InventoryMetrics,
}

impl Alerting {
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        publisher: EventPublisher,
        metrics: InventoryMetrics,
    ) -> Self {
        Self {
            alerts,
            publisher,
            metrics,
        }
    }

    /// Open an alert for `record` if it crossed a threshold and none is open yet.
    ///
    /// Returns the newly opened alert.
    pub async fn evaluate(&self, record: &StockRecord) -> Option<StockAlert> {
        let trigger = AlertTrigger::evaluate(record)?;
        let tenant_id = &trigger.key.tenant_id;

        let alert = StockAlert::open(AlertId::generate(), &trigger, Utc::now());
        let opened = match self.alerts.open_if_absent(alert).await {
            Ok(Some(alert)) => alert,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %trigger.key, alert_type = trigger.alert_type.as_str(), error = %err, "failed to open stock alert");
                return None;
            }
        };

        info!(
            key = %trigger.key,
            alert_id = %opened.id,
            alert_type = opened.alert_type.as_str(),
            available = trigger.available,
            "stock alert opened"
        );
        self.metrics
            .alert_created(tenant_id, opened.alert_type, opened.severity);

        let event = match opened.alert_type {
            AlertType::OutOfStock => InventoryEvent::OutOfStock(OutOfStock {
                tenant_id: tenant_id.clone(),
                product_id: opened.product_id.clone(),
                warehouse_id: Some(opened.warehouse_id.clone()),
                order_id: None,
                requested: None,
                available: Some(trigger.available),
                alert_id: Some(opened.id.clone()),
            }),
            AlertType::LowStock => InventoryEvent::LowStock(LowStock {
                tenant_id: tenant_id.clone(),
                product_id: opened.product_id.clone(),
                warehouse_id: opened.warehouse_id.clone(),
                available: trigger.available,
                reorder_level: trigger.reorder_level,
                alert_id: opened.id.clone(),
            }),
        };
        self.publisher.publish(event);

        if opened.alert_type == AlertType::LowStock {
            match self.alerts.count_open(tenant_id, AlertType::LowStock).await {
                Ok(open) => self.metrics.low_stock_alerts(tenant_id, open),
                Err(err) => warn!(tenant_id = %tenant_id, error = %err, "failed to count open alerts"),
            }
        }

        Some(opened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{product, tenant, Harness};
    use crate::store::OnMissing;
    use stockledger_events::inventory;
    use stockledger_inventory::{StockCommand, StockKey};

    async fn record(h: &Harness, available: i64) -> StockRecord {
        let key = StockKey::new(tenant(), h.warehouse(&tenant(), "w1").await, product("sku-1"));
        let change = h
            .ctx
            .stores
            .stock
            .apply(
                &key,
                StockCommand::Adjust { delta: available },
                OnMissing::Create { reorder_level: 5 },
            )
            .await
            .unwrap();
        change.record
    }

    #[tokio::test]
    async fn repeated_triggers_open_one_alert() {
        let mut h = Harness::new();
        let record = record(&h, 3).await;
        let alerting = h.ctx.alerting();

        let first = alerting.evaluate(&record).await.unwrap();
        assert_eq!(first.alert_type, AlertType::LowStock);
        assert!(alerting.evaluate(&record).await.is_none());

        let open = h.ctx.stores.alerts.list(&tenant(), false).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(h.drain_topics(), vec![inventory::LOW_STOCK.to_string()]);
    }

    #[tokio::test]
    async fn healthy_stock_opens_nothing() {
        let mut h = Harness::new();
        let record = record(&h, 50).await;

        assert!(h.ctx.alerting().evaluate(&record).await.is_none());
        assert!(h.drain_topics().is_empty());
    }

    #[tokio::test]
    async fn resolved_alert_allows_a_new_one() {
        let h = Harness::new();
        let record = record(&h, 3).await;
        let alerting = h.ctx.alerting();

        let first = alerting.evaluate(&record).await.unwrap();
        h.ctx
            .stores
            .alerts
            .resolve(&tenant(), &first.id, Utc::now())
            .await
            .unwrap();

        let second = alerting.evaluate(&record).await.unwrap();
        assert_ne!(first.id, second.id);
    }
}
