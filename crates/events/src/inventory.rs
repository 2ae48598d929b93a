//! Events published by the inventory core (`inventory.*` topics).
//!
//! Every payload carries `tenantId` and `productId`; the remaining fields are
//! present when the producing operation knows them. Payloads serialize as flat
//! camelCase JSON objects so non-Rust consumers can read them directly.

use serde::{Deserialize, Serialize};

use stockledger_core::{AlertId, OrderId, ProductId, TenantId, WarehouseId};

use crate::event::Event;

pub const RESERVED: &str = "inventory.reserved";
pub const RELEASED: &str = "inventory.released";
pub const CONFIRMED: &str = "inventory.confirmed";
pub const OUT_OF_STOCK: &str = "inventory.out_of_stock";
pub const LOW_STOCK: &str = "inventory.low_stock";
pub const STOCK_UPDATED: &str = "inventory.stock_updated";
pub const UNITS_DAMAGED: &str = "inventory.units_damaged";
pub const TRANSFER_COMPLETED: &str = "inventory.transfer_completed";
pub const CREATED: &str = "inventory.created";

/// All topics this core publishes on.
pub const TOPICS: [&str; 9] = [
    RESERVED,
    RELEASED,
    CONFIRMED,
    OUT_OF_STOCK,
    LOW_STOCK,
    STOCK_UPDATED,
    UNITS_DAMAGED,
    TRANSFER_COMPLETED,
    CREATED,
];

/// Units moved by a reserve, release or confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationMovement {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<WarehouseId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    pub quantity: i64,
    /// `available` on the record after the movement committed.
    pub available: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutOfStock {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<WarehouseId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<AlertId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStock {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub available: i64,
    pub reorder_level: i64,
    pub alert_id: AlertId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    /// Signed change actually applied (negative deltas are clamped to `available`).
    pub delta: i64,
    pub quantity: i64,
    pub available: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitsDamaged {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
    pub damaged: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferCompleted {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub from_warehouse_id: WarehouseId,
    pub to_warehouse_id: WarehouseId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCreated {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
}

/// Closed set of events published by the inventory core.
///
/// Serializes as the bare payload; the variant is carried by the topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum InventoryEvent {
    Reserved(ReservationMovement),
    Released(ReservationMovement),
    Confirmed(ReservationMovement),
    OutOfStock(OutOfStock),
    LowStock(LowStock),
    StockUpdated(StockUpdated),
    UnitsDamaged(UnitsDamaged),
    TransferCompleted(TransferCompleted),
    Created(StockCreated),
}

impl InventoryEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            InventoryEvent::Reserved(_) => RESERVED,
            InventoryEvent::Released(_) => RELEASED,
            InventoryEvent::Confirmed(_) => CONFIRMED,
            InventoryEvent::OutOfStock(_) => OUT_OF_STOCK,
            InventoryEvent::LowStock(_) => LOW_STOCK,
            InventoryEvent::StockUpdated(_) => STOCK_UPDATED,
            InventoryEvent::UnitsDamaged(_) => UNITS_DAMAGED,
            InventoryEvent::TransferCompleted(_) => TRANSFER_COMPLETED,
            InventoryEvent::Created(_) => CREATED,
        }
    }

    pub fn product_id(&self) -> &ProductId {
        match self {
            InventoryEvent::Reserved(e) | InventoryEvent::Released(e) | InventoryEvent::Confirmed(e) => {
                &e.product_id
            }
            InventoryEvent::OutOfStock(e) => &e.product_id,
            InventoryEvent::LowStock(e) => &e.product_id,
            InventoryEvent::StockUpdated(e) => &e.product_id,
            InventoryEvent::UnitsDamaged(e) => &e.product_id,
            InventoryEvent::TransferCompleted(e) => &e.product_id,
            InventoryEvent::Created(e) => &e.product_id,
        }
    }

    fn warehouse_id(&self) -> Option<&WarehouseId> {
        match self {
            InventoryEvent::Reserved(e) | InventoryEvent::Released(e) | InventoryEvent::Confirmed(e) => {
                e.warehouse_id.as_ref()
            }
            InventoryEvent::OutOfStock(e) => e.warehouse_id.as_ref(),
            InventoryEvent::LowStock(e) => Some(&e.warehouse_id),
            InventoryEvent::StockUpdated(e) => Some(&e.warehouse_id),
            InventoryEvent::UnitsDamaged(e) => Some(&e.warehouse_id),
            InventoryEvent::TransferCompleted(e) => Some(&e.from_warehouse_id),
            InventoryEvent::Created(e) => Some(&e.warehouse_id),
        }
    }
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        self.topic()
    }

    fn tenant_id(&self) -> &TenantId {
        match self {
            InventoryEvent::Reserved(e) | InventoryEvent::Released(e) | InventoryEvent::Confirmed(e) => {
                &e.tenant_id
            }
            InventoryEvent::OutOfStock(e) => &e.tenant_id,
            InventoryEvent::LowStock(e) => &e.tenant_id,
            InventoryEvent::StockUpdated(e) => &e.tenant_id,
            InventoryEvent::UnitsDamaged(e) => &e.tenant_id,
            InventoryEvent::TransferCompleted(e) => &e.tenant_id,
            InventoryEvent::Created(e) => &e.tenant_id,
        }
    }

    /// Stock events are keyed by the stock triple. Out-of-stock notices raised for
    /// an order are keyed by that order so the order service sees them in sequence.
    fn partition_key(&self) -> String {
        if let InventoryEvent::OutOfStock(OutOfStock {
            order_id: Some(order_id),
            ..
        }) = self
        {
            return order_id.to_string();
        }

        match self.warehouse_id() {
            Some(warehouse_id) => format!(
                "{}:{}:{}",
                Event::tenant_id(self),
                warehouse_id,
                self.product_id()
            ),
            None => format!("{}:{}", Event::tenant_id(self), self.product_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::envelope::EventEnvelope;

    fn tenant() -> TenantId {
        TenantId::parse("acme").unwrap()
    }

    fn product() -> ProductId {
        ProductId::parse("sku-1").unwrap()
    }

    #[test]
    fn reserved_serializes_as_flat_camel_case_payload() {
        let event = InventoryEvent::Reserved(ReservationMovement {
            tenant_id: tenant(),
            product_id: product(),
            warehouse_id: Some(WarehouseId::parse("w1").unwrap()),
            order_id: Some(OrderId::parse("o-1").unwrap()),
            quantity: 5,
            available: 5,
        });

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "tenantId": "acme",
                "productId": "sku-1",
                "warehouseId": "w1",
                "orderId": "o-1",
                "quantity": 5,
                "available": 5
            })
        );
        assert_eq!(event.partition_key(), "acme:w1:sku-1");
    }

    #[test]
    fn out_of_stock_for_an_order_is_keyed_by_the_order() {
        let event = InventoryEvent::OutOfStock(OutOfStock {
            tenant_id: tenant(),
            product_id: product(),
            warehouse_id: None,
            order_id: Some(OrderId::parse("o-9").unwrap()),
            requested: Some(3),
            available: Some(0),
            alert_id: None,
        });

        assert_eq!(event.partition_key(), "o-9");

        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("warehouseId").is_none());
        assert!(value.get("alertId").is_none());
    }

    #[test]
    fn envelope_takes_topic_and_key_from_the_event() {
        let event = InventoryEvent::TransferCompleted(TransferCompleted {
            tenant_id: tenant(),
            product_id: product(),
            from_warehouse_id: WarehouseId::parse("a").unwrap(),
            to_warehouse_id: WarehouseId::parse("b").unwrap(),
            quantity: 2,
        });

        let envelope = EventEnvelope::from_event(&event, Utc::now()).unwrap();
        assert_eq!(envelope.topic(), TRANSFER_COMPLETED);
        assert_eq!(envelope.key(), "acme:a:sku-1");
        assert_eq!(envelope.tenant_id(), &tenant());
        assert_eq!(envelope.payload()["toWarehouseId"], "b");
    }
}
