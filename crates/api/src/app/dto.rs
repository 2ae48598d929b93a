use serde::Deserialize;

use stockledger_core::{OrderId, ProductId, WarehouseId};
use stockledger_inventory::{ReservationItem, WarehouseItem};

// -------------------------
// Default-warehouse stock
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStockRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Body shared by the default-warehouse reserve/confirm/release endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

// -------------------------
// Warehouses
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWarehouseRequest {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

// -------------------------
// Per-warehouse stock levels
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevelQuery {
    pub warehouse_id: Option<WarehouseId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStockRequest {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    #[serde(alias = "delta")]
    pub delta_quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageRequest {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub product_id: ProductId,
    pub from_warehouse_id: WarehouseId,
    pub to_warehouse_id: WarehouseId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderLevelRequest {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub level: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsQuery {
    #[serde(default)]
    pub include_resolved: bool,
}

// -------------------------
// Reservations
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    pub warehouse_id: WarehouseId,
    pub items: Vec<ReservationItem>,
    pub order_id: OrderId,
}

/// Release/confirm body; items name their warehouse.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldItemsRequest {
    pub items: Vec<WarehouseItem>,
    #[serde(default)]
    pub order_id: Option<OrderId>,
}
