use serde::Serialize;

use stockledger_core::{ProductId, TenantId};

use crate::stock::StockRecord;

/// Stock for one product summed across a tenant's warehouses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub reserved: i64,
    pub damaged: i64,
    pub available: i64,
    pub warehouses: Vec<StockRecord>,
}

impl StockLevel {
    pub fn aggregate(tenant_id: TenantId, product_id: ProductId, records: Vec<StockRecord>) -> Self {
        let mut level = Self {
            tenant_id,
            product_id,
            quantity: 0,
            reserved: 0,
            damaged: 0,
            available: 0,
            warehouses: Vec::with_capacity(records.len()),
        };
        // Per-record counters are bounded; their sum across warehouses is not.
        for record in records {
            level.quantity = level.quantity.saturating_add(record.quantity());
            level.reserved = level.reserved.saturating_add(record.reserved());
            level.damaged = level.damaged.saturating_add(record.damaged());
            level.available = level.available.saturating_add(record.available());
            level.warehouses.push(record);
        }
        level
    }
}
