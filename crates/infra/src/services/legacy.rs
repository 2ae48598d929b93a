//! Single-warehouse inventory operations.
//!
//! Everything here acts on the tenant's default warehouse, which is created
//! on first use. Release and confirm never fail on a shortfall: they move what
//! is reserved and report the record.

use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};

use stockledger_core::{OrderId, ProductId, TenantId};
use stockledger_events::{
    InventoryEvent, OutOfStock, ReservationMovement, StockCreated, StockUpdated,
};
use stockledger_inventory::{StockCommand, StockError, StockKey, StockRecord, Warehouse};

use super::{ServiceContext, ServiceError};
use crate::store::{OnMissing, StoreError};

pub const DEFAULT_LIST_LIMIT: usize = 50;

const DEFAULT_WAREHOUSE_NAME: &str = "default";

#[derive(Clone)]
pub struct LegacyInventoryService {
    ctx: ServiceContext,
}

impl LegacyInventoryService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    fn key(&self, tenant_id: &TenantId, product_id: &ProductId) -> StockKey {
        StockKey::new(
            tenant_id.clone(),
            self.ctx.default_warehouse.clone(),
            product_id.clone(),
        )
    }

    async fn ensure_default_warehouse(&self, tenant_id: &TenantId) -> Result<(), ServiceError> {
        let warehouses = &self.ctx.stores.warehouses;
        if warehouses
            .get(tenant_id, &self.ctx.default_warehouse)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let warehouse = Warehouse::new(
            tenant_id.clone(),
            self.ctx.default_warehouse.clone(),
            DEFAULT_WAREHOUSE_NAME,
            None,
            Utc::now(),
        )?;
        match warehouses.insert(warehouse).await {
            Ok(_) => {
                info!(tenant_id = %tenant_id, warehouse_id = %self.ctx.default_warehouse, "default warehouse created");
                Ok(())
            }
            // Created concurrently.
            Err(StoreError::AlreadyExists(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn add_stock(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<StockRecord, ServiceError> {
        let started = Instant::now();
        if quantity <= 0 {
            return Err(ServiceError::Validation(
                "quantity must be positive".to_string(),
            ));
        }
        let writer = self.ctx.stock_writer().await;
        self.ensure_default_warehouse(tenant_id).await?;

        let key = self.key(tenant_id, product_id);
        let change = self
            .ctx
            .stores
            .stock
            .apply(
                &key,
                StockCommand::Adjust { delta: quantity },
                OnMissing::Create {
                    reorder_level: self.ctx.default_reorder_level,
                },
            )
            .await?;
        drop(writer);
        let record = change.record;

        info!(key = %key, quantity, created = change.created, "stock added");
        let warehouse_id = record.warehouse_id().clone();
        self.ctx.metrics.stock_update(tenant_id, warehouse_id.as_str(), "add");
        self.ctx.metrics.record_levels(&record);
        self.ctx
            .metrics
            .stock_update_duration(tenant_id, started.elapsed());

        let event = if change.created {
            InventoryEvent::Created(StockCreated {
                tenant_id: tenant_id.clone(),
                product_id: product_id.clone(),
                warehouse_id,
                quantity: record.quantity(),
            })
        } else {
            InventoryEvent::StockUpdated(StockUpdated {
                tenant_id: tenant_id.clone(),
                product_id: product_id.clone(),
                warehouse_id,
                delta: change.applied,
                quantity: record.quantity(),
                available: record.available(),
            })
        };
        self.ctx.publisher.publish(event);

        Ok(record)
    }

    /// Reserve from the default warehouse.
    ///
    /// A shortage or missing record publishes `inventory.out_of_stock` for the order.
    #[instrument(skip(self), err)]
    pub async fn reserve_stock(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        quantity: i64,
        order_id: Option<&OrderId>,
    ) -> Result<StockRecord, ServiceError> {
        let started = Instant::now();
        let key = self.key(tenant_id, product_id);
        let warehouse_id = self.ctx.default_warehouse.as_str();
        let command = StockCommand::Reserve {
            order_id: order_id.cloned(),
            quantity,
        };

        let outcome = self.ctx.stores.stock.apply(&key, command, OnMissing::Fail).await;
        self.ctx
            .metrics
            .reservation_duration(tenant_id, started.elapsed());

        let change = match outcome {
            Ok(change) => change,
            Err(err) => {
                let available = match &err {
                    StoreError::Stock(StockError::InsufficientStock { available, .. }) => {
                        Some(*available)
                    }
                    StoreError::NotFound => None,
                    _ => return Err(err.into()),
                };
                let reason = if available.is_some() {
                    "insufficient_stock"
                } else {
                    "stock_not_found"
                };
                warn!(key = %key, order_id = ?order_id, requested = quantity, ?available, "legacy reservation failed");
                self.ctx
                    .metrics
                    .reservation_failed(tenant_id, warehouse_id, reason);
                self.ctx
                    .publisher
                    .publish(InventoryEvent::OutOfStock(OutOfStock {
                        tenant_id: tenant_id.clone(),
                        product_id: product_id.clone(),
                        warehouse_id: None,
                        order_id: order_id.cloned(),
                        requested: Some(quantity),
                        available,
                        alert_id: None,
                    }));
                return Err(err.into());
            }
        };

        if !change.already_held {
            info!(key = %key, order_id = ?order_id, quantity, "stock reserved");
            self.ctx
                .metrics
                .reservation_succeeded(tenant_id, warehouse_id);
            self.ctx.metrics.record_levels(&change.record);
            self.ctx
                .publisher
                .publish(InventoryEvent::Reserved(ReservationMovement {
                    tenant_id: tenant_id.clone(),
                    product_id: product_id.clone(),
                    warehouse_id: Some(self.ctx.default_warehouse.clone()),
                    order_id: order_id.cloned(),
                    quantity: change.applied,
                    available: change.record.available(),
                }));
            self.ctx.alerting().evaluate(&change.record).await;
        }

        Ok(change.record)
    }

    #[instrument(skip(self), err)]
    pub async fn release_stock(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        quantity: i64,
        order_id: Option<&OrderId>,
    ) -> Result<StockRecord, ServiceError> {
        let command = StockCommand::Release {
            order_id: order_id.cloned(),
            quantity,
        };
        self.move_held(tenant_id, product_id, command, order_id).await
    }

    #[instrument(skip(self), err)]
    pub async fn confirm_stock(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        quantity: i64,
        order_id: Option<&OrderId>,
    ) -> Result<StockRecord, ServiceError> {
        let command = StockCommand::Confirm {
            order_id: order_id.cloned(),
            quantity,
        };
        self.move_held(tenant_id, product_id, command, order_id).await
    }

    async fn move_held(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        command: StockCommand,
        order_id: Option<&OrderId>,
    ) -> Result<StockRecord, ServiceError> {
        let key = self.key(tenant_id, product_id);
        let is_release = matches!(command, StockCommand::Release { .. });
        let change = self
            .ctx
            .stores
            .stock
            .apply(&key, command, OnMissing::Fail)
            .await?;

        if change.applied == 0 {
            info!(key = %key, order_id = ?order_id, "nothing reserved; skipped");
            return Ok(change.record);
        }

        let warehouse_id = self.ctx.default_warehouse.clone();
        let payload = ReservationMovement {
            tenant_id: tenant_id.clone(),
            product_id: product_id.clone(),
            warehouse_id: Some(warehouse_id.clone()),
            order_id: order_id.cloned(),
            quantity: change.applied,
            available: change.record.available(),
        };
        let event = if is_release {
            self.ctx
                .metrics
                .release_succeeded(tenant_id, warehouse_id.as_str());
            InventoryEvent::Released(payload)
        } else {
            self.ctx
                .metrics
                .confirm_succeeded(tenant_id, warehouse_id.as_str());
            InventoryEvent::Confirmed(payload)
        };
        info!(key = %key, order_id = ?order_id, topic = event.topic(), quantity = change.applied, "reservation moved");
        self.ctx.metrics.record_levels(&change.record);
        self.ctx.publisher.publish(event);

        Ok(change.record)
    }

    pub async fn get_inventory(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
    ) -> Result<StockRecord, ServiceError> {
        self.ctx
            .stores
            .stock
            .get(&self.key(tenant_id, product_id))
            .await?
            .ok_or(ServiceError::NotFound("stock record"))
    }

    /// Default-warehouse records, most recently updated first.
    pub async fn list_inventory(
        &self,
        tenant_id: &TenantId,
        limit: Option<usize>,
    ) -> Result<Vec<StockRecord>, ServiceError> {
        Ok(self
            .ctx
            .stores
            .stock
            .list_for_warehouse(
                tenant_id,
                &self.ctx.default_warehouse,
                Some(limit.unwrap_or(DEFAULT_LIST_LIMIT)),
            )
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{product, tenant, Harness};
    use stockledger_events::inventory;

    #[tokio::test]
    async fn add_creates_default_warehouse_and_record() {
        let mut h = Harness::new();
        let legacy = h.services().legacy;

        let record = legacy.add_stock(&tenant(), &product("sku-1"), 10).await.unwrap();
        assert_eq!(record.quantity(), 10);
        assert_eq!(record.warehouse_id().as_str(), "default");

        legacy.add_stock(&tenant(), &product("sku-1"), 5).await.unwrap();
        assert_eq!(
            h.drain_topics(),
            vec![inventory::CREATED.to_string(), inventory::STOCK_UPDATED.to_string()]
        );

        let warehouses = h.ctx.stores.warehouses.list(&tenant(), true).await.unwrap();
        assert_eq!(warehouses.len(), 1);
        assert_eq!(warehouses[0].name, "default");
    }

    #[tokio::test]
    async fn shortage_publishes_out_of_stock_for_the_order() {
        let mut h = Harness::new();
        let legacy = h.services().legacy;
        legacy.add_stock(&tenant(), &product("sku-1"), 50).await.unwrap();
        h.drain();

        let order = OrderId::parse("o-9").unwrap();
        let err = legacy
            .reserve_stock(&tenant(), &product("sku-1"), 80, Some(&order))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InsufficientStock {
                requested: 80,
                available: 50
            }
        ));

        let events = h.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].topic(), inventory::OUT_OF_STOCK);
        assert_eq!(events[0].payload()["orderId"], "o-9");
        assert_eq!(events[0].payload()["available"], 50);
        assert_eq!(events[0].key(), "o-9");
    }

    #[tokio::test]
    async fn missing_record_reservation_is_not_found() {
        let mut h = Harness::new();
        let err = h
            .services()
            .legacy
            .reserve_stock(&tenant(), &product("nope"), 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("stock record")));
        assert_eq!(h.drain_topics(), vec![inventory::OUT_OF_STOCK.to_string()]);
    }

    #[tokio::test]
    async fn release_and_confirm_tolerate_shortfall() {
        let h = Harness::new();
        let legacy = h.services().legacy;
        legacy.add_stock(&tenant(), &product("sku-1"), 20).await.unwrap();
        legacy
            .reserve_stock(&tenant(), &product("sku-1"), 6, None)
            .await
            .unwrap();

        let record = legacy
            .release_stock(&tenant(), &product("sku-1"), 2, None)
            .await
            .unwrap();
        assert_eq!(record.reserved(), 4);

        let record = legacy
            .confirm_stock(&tenant(), &product("sku-1"), 100, None)
            .await
            .unwrap();
        assert_eq!((record.quantity(), record.reserved(), record.available()), (16, 0, 16));

        let record = legacy
            .release_stock(&tenant(), &product("sku-1"), 3, None)
            .await
            .unwrap();
        assert_eq!(record.available(), 16);
    }

    #[tokio::test]
    async fn list_is_limited_and_newest_first() {
        let h = Harness::new();
        let legacy = h.services().legacy;
        for sku in ["a", "b", "c"] {
            legacy.add_stock(&tenant(), &product(sku), 1).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let listed = legacy.list_inventory(&tenant(), Some(2)).await.unwrap();
        let skus: Vec<_> = listed.iter().map(|r| r.product_id().as_str()).collect();
        assert_eq!(skus, vec!["c", "b"]);

        let record = legacy.get_inventory(&tenant(), &product("a")).await.unwrap();
        assert_eq!(record.quantity(), 1);
    }
}
