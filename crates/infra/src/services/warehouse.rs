use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use stockledger_core::{TenantId, WarehouseId};
use stockledger_inventory::{StockRecord, Warehouse, WarehousePatch};

use super::{ServiceContext, ServiceError};

/// A warehouse together with its stock records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseDetails {
    #[serde(flatten)]
    pub warehouse: Warehouse,
    pub stock: Vec<StockRecord>,
}

#[derive(Clone)]
pub struct WarehouseService {
    ctx: ServiceContext,
}

impl WarehouseService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    async fn details(&self, warehouse: Warehouse) -> Result<WarehouseDetails, ServiceError> {
        let stock = self
            .ctx
            .stores
            .stock
            .list_for_warehouse(&warehouse.tenant_id, &warehouse.id, None)
            .await?;
        Ok(WarehouseDetails { warehouse, stock })
    }

    /// New warehouses are active; names are unique per tenant.
    #[instrument(skip(self), err)]
    pub async fn create_warehouse(
        &self,
        tenant_id: &TenantId,
        name: &str,
        location: Option<String>,
    ) -> Result<Warehouse, ServiceError> {
        let warehouse = Warehouse::new(
            tenant_id.clone(),
            WarehouseId::generate(),
            name,
            location,
            Utc::now(),
        )?;
        let warehouse = self.ctx.stores.warehouses.insert(warehouse).await?;
        info!(tenant_id = %tenant_id, warehouse_id = %warehouse.id, name = %warehouse.name, "warehouse created");
        Ok(warehouse)
    }

    /// Active warehouses with their stock.
    pub async fn list_warehouses(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<WarehouseDetails>, ServiceError> {
        let warehouses = self.ctx.stores.warehouses.list(tenant_id, true).await?;
        let mut out = Vec::with_capacity(warehouses.len());
        for warehouse in warehouses {
            out.push(self.details(warehouse).await?);
        }
        Ok(out)
    }

    pub async fn get_warehouse(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
    ) -> Result<WarehouseDetails, ServiceError> {
        let warehouse = self.ctx.require_warehouse(tenant_id, warehouse_id).await?;
        self.details(warehouse).await
    }

    #[instrument(skip(self), err)]
    pub async fn update_warehouse(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
        patch: &WarehousePatch,
    ) -> Result<Warehouse, ServiceError> {
        let mut warehouse = self.ctx.require_warehouse(tenant_id, warehouse_id).await?;
        warehouse.apply(patch, Utc::now())?;
        let warehouse = self
            .ctx
            .stores
            .warehouses
            .update(warehouse)
            .await
            .map_err(ServiceError::missing("warehouse"))?;
        info!(tenant_id = %tenant_id, warehouse_id = %warehouse.id, "warehouse updated");
        Ok(warehouse)
    }

    /// Delete a warehouse and its stock records.
    ///
    /// Rejected with `ActiveReservations` while any record has reserved units.
    /// No stock record can be created for the warehouse while this runs.
    #[instrument(skip(self), err)]
    pub async fn delete_warehouse(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
    ) -> Result<(), ServiceError> {
        let _removal = self.ctx.warehouse_removal().await;
        self.ctx.require_warehouse(tenant_id, warehouse_id).await?;
        let purged = self
            .ctx
            .stores
            .stock
            .purge_warehouse(tenant_id, warehouse_id)
            .await?;
        self.ctx
            .stores
            .warehouses
            .delete(tenant_id, warehouse_id)
            .await
            .map_err(ServiceError::missing("warehouse"))?;
        info!(tenant_id = %tenant_id, warehouse_id = %warehouse_id, purged, "warehouse deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{product, tenant, Harness};
    use stockledger_core::OrderId;
    use stockledger_inventory::ReservationItem;

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let h = Harness::new();
        let service = h.services().warehouses;

        service
            .create_warehouse(&tenant(), "Main", Some("Berlin".into()))
            .await
            .unwrap();
        let err = service
            .create_warehouse(&tenant(), "Main", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists(_)));

        let other = TenantId::parse("t2").unwrap();
        service.create_warehouse(&other, "Main", None).await.unwrap();
    }

    #[tokio::test]
    async fn rename_onto_existing_name_is_rejected() {
        let h = Harness::new();
        let service = h.services().warehouses;
        service.create_warehouse(&tenant(), "A", None).await.unwrap();
        let b = service.create_warehouse(&tenant(), "B", None).await.unwrap();

        let patch = WarehousePatch {
            name: Some("A".into()),
            ..Default::default()
        };
        let err = service
            .update_warehouse(&tenant(), &b.id, &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn deactivated_warehouses_are_not_listed() {
        let h = Harness::new();
        let service = h.services().warehouses;
        let a = service.create_warehouse(&tenant(), "A", None).await.unwrap();
        service.create_warehouse(&tenant(), "B", None).await.unwrap();

        let patch = WarehousePatch {
            is_active: Some(false),
            ..Default::default()
        };
        service.update_warehouse(&tenant(), &a.id, &patch).await.unwrap();

        let listed = service.list_warehouses(&tenant()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].warehouse.name, "B");
    }

    #[tokio::test]
    async fn delete_is_blocked_by_reservations() {
        let h = Harness::new();
        let services = h.services();
        let w = services
            .warehouses
            .create_warehouse(&tenant(), "Main", None)
            .await
            .unwrap();
        services
            .stock_levels
            .update_stock(&tenant(), &product("sku-1"), &w.id, 10)
            .await
            .unwrap();
        services
            .reservations
            .reserve_from_warehouse(
                &tenant(),
                &w.id,
                &[ReservationItem {
                    product_id: product("sku-1"),
                    quantity: 3,
                }],
                &OrderId::parse("o-1").unwrap(),
            )
            .await
            .unwrap();

        let err = services
            .warehouses
            .delete_warehouse(&tenant(), &w.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ActiveReservations));

        let details = services.warehouses.get_warehouse(&tenant(), &w.id).await.unwrap();
        assert_eq!(details.stock.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_stock_records() {
        let h = Harness::new();
        let services = h.services();
        let w = services
            .warehouses
            .create_warehouse(&tenant(), "Main", None)
            .await
            .unwrap();
        services
            .stock_levels
            .update_stock(&tenant(), &product("sku-1"), &w.id, 10)
            .await
            .unwrap();

        services
            .warehouses
            .delete_warehouse(&tenant(), &w.id)
            .await
            .unwrap();

        let err = services
            .warehouses
            .get_warehouse(&tenant(), &w.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("warehouse")));
        let level = services
            .stock_levels
            .get_stock_level(&tenant(), &product("sku-1"), None)
            .await
            .unwrap();
        let crate::services::StockLevelView::Aggregate(level) = level else {
            panic!("expected aggregate");
        };
        assert!(level.warehouses.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stock_never_outlives_a_deleted_warehouse() {
        for round in 0..20 {
            let h = Harness::new();
            let services = h.services();
            let w = services
                .warehouses
                .create_warehouse(&tenant(), "Main", None)
                .await
                .unwrap();

            let writer = tokio::spawn({
                let levels = services.stock_levels.clone();
                let id = w.id.clone();
                async move {
                    levels
                        .update_stock(&tenant(), &product("sku-1"), &id, 5)
                        .await
                }
            });
            services
                .warehouses
                .delete_warehouse(&tenant(), &w.id)
                .await
                .unwrap();

            if let Err(err) = writer.await.unwrap() {
                assert!(matches!(err, ServiceError::NotFound("warehouse")), "round {round}: {err}");
            }
            let remaining = h
                .ctx
                .stores
                .stock
                .list_for_warehouse(&tenant(), &w.id, None)
                .await
                .unwrap();
            assert!(remaining.is_empty(), "round {round}: orphaned {remaining:?}");
        }
    }
}
