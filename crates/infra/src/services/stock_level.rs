use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use stockledger_core::{AlertId, ProductId, TenantId, WarehouseId};
use stockledger_events::{InventoryEvent, StockUpdated, TransferCompleted, UnitsDamaged};
use stockledger_inventory::{StockAlert, StockCommand, StockKey, StockLevel, StockRecord};

use super::{ServiceContext, ServiceError};
use crate::store::OnMissing;

/// Result of a stock level query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StockLevelView {
    /// The record of the requested warehouse.
    Warehouse(StockRecord),
    /// Totals across every warehouse holding the product.
    Aggregate(StockLevel),
}

/// Stock queries, adjustments, damage, transfers and alert administration.
#[derive(Clone)]
pub struct StockLevelService {
    ctx: ServiceContext,
}

impl StockLevelService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self), err)]
    pub async fn get_stock_level(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        warehouse_id: Option<&WarehouseId>,
    ) -> Result<StockLevelView, ServiceError> {
        match warehouse_id {
            Some(warehouse_id) => {
                let key = StockKey::new(
                    tenant_id.clone(),
                    warehouse_id.clone(),
                    product_id.clone(),
                );
                self.ctx
                    .stores
                    .stock
                    .get(&key)
                    .await?
                    .map(StockLevelView::Warehouse)
                    .ok_or(ServiceError::NotFound("stock record"))
            }
            None => {
                let records = self
                    .ctx
                    .stores
                    .stock
                    .list_for_product(tenant_id, product_id)
                    .await?;
                Ok(StockLevelView::Aggregate(StockLevel::aggregate(
                    tenant_id.clone(),
                    product_id.clone(),
                    records,
                )))
            }
        }
    }

    /// Add (positive) or remove (negative) on-hand units, creating the record if needed.
    ///
    /// Removal is limited to `available`; reserved units are never adjusted away.
    #[instrument(skip(self), err)]
    pub async fn update_stock(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
        delta: i64,
    ) -> Result<StockRecord, ServiceError> {
        let started = Instant::now();
        let writer = self.ctx.stock_writer().await;
        self.ctx.require_warehouse(tenant_id, warehouse_id).await?;

        let key = StockKey::new(tenant_id.clone(), warehouse_id.clone(), product_id.clone());
        let change = self
            .ctx
            .stores
            .stock
            .apply(
                &key,
                StockCommand::Adjust { delta },
                OnMissing::Create {
                    reorder_level: self.ctx.default_reorder_level,
                },
            )
            .await?;
        drop(writer);
        let record = change.record;

        info!(key = %key, delta, applied = change.applied, quantity = record.quantity(), "stock updated");
        self.ctx.metrics.stock_update(tenant_id, warehouse_id.as_str(), "update");
        self.ctx.metrics.record_levels(&record);
        self.ctx
            .metrics
            .stock_update_duration(tenant_id, started.elapsed());

        self.ctx
            .publisher
            .publish(InventoryEvent::StockUpdated(StockUpdated {
                tenant_id: tenant_id.clone(),
                product_id: product_id.clone(),
                warehouse_id: warehouse_id.clone(),
                delta: change.applied,
                quantity: record.quantity(),
                available: record.available(),
            }));
        self.ctx.alerting().evaluate(&record).await;

        Ok(record)
    }

    /// Move up to `quantity` available units into the damaged pool.
    #[instrument(skip(self), err)]
    pub async fn mark_damaged(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
        quantity: i64,
    ) -> Result<StockRecord, ServiceError> {
        let started = Instant::now();
        let key = StockKey::new(tenant_id.clone(), warehouse_id.clone(), product_id.clone());
        let change = self
            .ctx
            .stores
            .stock
            .apply(&key, StockCommand::MarkDamaged { quantity }, OnMissing::Fail)
            .await?;
        let record = change.record;

        info!(key = %key, requested = quantity, damaged = change.applied, "units marked damaged");
        self.ctx
            .metrics
            .damaged(tenant_id, warehouse_id.as_str(), change.applied);
        self.ctx.metrics.stock_update(tenant_id, warehouse_id.as_str(), "damage");
        self.ctx.metrics.record_levels(&record);
        self.ctx
            .metrics
            .stock_update_duration(tenant_id, started.elapsed());

        self.ctx
            .publisher
            .publish(InventoryEvent::UnitsDamaged(UnitsDamaged {
                tenant_id: tenant_id.clone(),
                product_id: product_id.clone(),
                warehouse_id: warehouse_id.clone(),
                quantity: change.applied,
                damaged: record.damaged(),
            }));
        self.ctx.alerting().evaluate(&record).await;

        Ok(record)
    }

    /// Move available units between two warehouses; both sides commit or neither does.
    ///
    /// Returns the source and destination records after the move.
    #[instrument(skip(self), err)]
    pub async fn transfer_stock(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        from_warehouse_id: &WarehouseId,
        to_warehouse_id: &WarehouseId,
        quantity: i64,
    ) -> Result<(StockRecord, StockRecord), ServiceError> {
        let started = Instant::now();
        if from_warehouse_id == to_warehouse_id {
            return Err(ServiceError::Validation(
                "source and destination warehouses must differ".to_string(),
            ));
        }
        let writer = self.ctx.stock_writer().await;
        self.ctx
            .require_warehouse(tenant_id, from_warehouse_id)
            .await?;
        self.ctx.require_warehouse(tenant_id, to_warehouse_id).await?;

        let from = StockKey::new(
            tenant_id.clone(),
            from_warehouse_id.clone(),
            product_id.clone(),
        );
        let transfer = self
            .ctx
            .stores
            .stock
            .transfer(
                &from,
                to_warehouse_id,
                quantity,
                self.ctx.default_reorder_level,
            )
            .await?;
        drop(writer);

        info!(from = %from, to = %to_warehouse_id, quantity = transfer.quantity, "stock transferred");
        let metrics = &self.ctx.metrics;
        metrics.transfer(tenant_id, from_warehouse_id.as_str(), to_warehouse_id.as_str());
        metrics.stock_update(tenant_id, from_warehouse_id.as_str(), "transfer");
        metrics.record_levels(&transfer.source);
        metrics.record_levels(&transfer.destination);
        metrics.stock_update_duration(tenant_id, started.elapsed());

        self.ctx
            .publisher
            .publish(InventoryEvent::TransferCompleted(TransferCompleted {
                tenant_id: tenant_id.clone(),
                product_id: product_id.clone(),
                from_warehouse_id: from_warehouse_id.clone(),
                to_warehouse_id: to_warehouse_id.clone(),
                quantity: transfer.quantity,
            }));
        self.ctx.alerting().evaluate(&transfer.source).await;

        Ok((transfer.source, transfer.destination))
    }

    #[instrument(skip(self), err)]
    pub async fn set_reorder_level(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
        warehouse_id: &WarehouseId,
        level: i64,
    ) -> Result<StockRecord, ServiceError> {
        let key = StockKey::new(tenant_id.clone(), warehouse_id.clone(), product_id.clone());
        let change = self
            .ctx
            .stores
            .stock
            .apply(&key, StockCommand::SetReorderLevel { level }, OnMissing::Fail)
            .await?;

        info!(key = %key, level, "reorder level set");
        self.ctx.alerting().evaluate(&change.record).await;
        Ok(change.record)
    }

    pub async fn list_alerts(
        &self,
        tenant_id: &TenantId,
        include_resolved: bool,
    ) -> Result<Vec<StockAlert>, ServiceError> {
        Ok(self.ctx.stores.alerts.list(tenant_id, include_resolved).await?)
    }

    /// Resolving an already resolved alert returns it unchanged.
    #[instrument(skip(self), err)]
    pub async fn resolve_alert(
        &self,
        tenant_id: &TenantId,
        alert_id: &AlertId,
    ) -> Result<StockAlert, ServiceError> {
        let alert = self
            .ctx
            .stores
            .alerts
            .resolve(tenant_id, alert_id, Utc::now())
            .await
            .map_err(ServiceError::missing("alert"))?;
        info!(alert_id = %alert.id, "stock alert resolved");
        Ok(alert)
    }
}
