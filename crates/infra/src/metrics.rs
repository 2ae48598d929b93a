//! Inventory metrics.
//!
//! Thin wrapper over the `metrics` facade. Without an installed recorder every
//! call is a no-op, so recording never affects control flow.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use stockledger_core::TenantId;
use stockledger_inventory::{AlertType, Severity, StockRecord};

pub const RESERVATIONS_SUCCESS: &str = "inventory_reservations_success_total";
pub const RESERVATIONS_FAILED: &str = "inventory_reservations_failed_total";
pub const RELEASES_SUCCESS: &str = "inventory_releases_success_total";
pub const CONFIRMS_SUCCESS: &str = "inventory_confirms_success_total";
pub const TRANSFERS: &str = "inventory_transfers_total";
pub const DAMAGED_UNITS_TOTAL: &str = "inventory_damaged_units_total";
pub const STOCK_UPDATES: &str = "inventory_stock_updates_total";
pub const ALERTS_CREATED: &str = "inventory_alerts_created_total";
pub const EVENTS_PUBLISH_FAILED: &str = "inventory_events_publish_failed_total";
pub const TOTAL_STOCK: &str = "inventory_total_stock";
pub const RESERVED_UNITS: &str = "inventory_reserved_units";
pub const DAMAGED_UNITS: &str = "inventory_damaged_units";
pub const LOW_STOCK_ALERTS_ACTIVE: &str = "inventory_low_stock_alerts_active";
pub const RESERVATION_DURATION: &str = "inventory_reservation_duration_seconds";
pub const STOCK_UPDATE_DURATION: &str = "inventory_stock_update_duration_seconds";

/// Register metric descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(RESERVATIONS_SUCCESS, "Total successful stock reservations");
    describe_counter!(RESERVATIONS_FAILED, "Total failed stock reservations");
    describe_counter!(RELEASES_SUCCESS, "Total successful stock releases");
    describe_counter!(CONFIRMS_SUCCESS, "Total confirmed reservations");
    describe_counter!(TRANSFERS, "Total stock transfers between warehouses");
    describe_counter!(DAMAGED_UNITS_TOTAL, "Total units marked as damaged");
    describe_counter!(STOCK_UPDATES, "Total stock update operations");
    describe_counter!(ALERTS_CREATED, "Total alerts created");
    describe_counter!(EVENTS_PUBLISH_FAILED, "Events that could not be published");
    describe_gauge!(TOTAL_STOCK, "Current stock units per warehouse and product");
    describe_gauge!(RESERVED_UNITS, "Current reserved units");
    describe_gauge!(DAMAGED_UNITS, "Current damaged units");
    describe_gauge!(LOW_STOCK_ALERTS_ACTIVE, "Number of open low stock alerts");
    describe_histogram!(RESERVATION_DURATION, "Time taken to complete a reservation");
    describe_histogram!(STOCK_UPDATE_DURATION, "Time taken to update stock");
}

/// Recorder for inventory operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryMetrics;

impl InventoryMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn reservation_succeeded(&self, tenant_id: &TenantId, warehouse_id: &str) {
        counter!(
            RESERVATIONS_SUCCESS,
            "tenant_id" => tenant_id.to_string(),
            "warehouse_id" => warehouse_id.to_string()
        )
        .increment(1);
    }

    pub fn reservation_failed(&self, tenant_id: &TenantId, warehouse_id: &str, reason: &'static str) {
        counter!(
            RESERVATIONS_FAILED,
            "tenant_id" => tenant_id.to_string(),
            "warehouse_id" => warehouse_id.to_string(),
            "reason" => reason
        )
        .increment(1);
    }

    pub fn release_succeeded(&self, tenant_id: &TenantId, warehouse_id: &str) {
        counter!(
            RELEASES_SUCCESS,
            "tenant_id" => tenant_id.to_string(),
            "warehouse_id" => warehouse_id.to_string()
        )
        .increment(1);
    }

    pub fn confirm_succeeded(&self, tenant_id: &TenantId, warehouse_id: &str) {
        counter!(
            CONFIRMS_SUCCESS,
            "tenant_id" => tenant_id.to_string(),
            "warehouse_id" => warehouse_id.to_string()
        )
        .increment(1);
    }

    pub fn transfer(&self, tenant_id: &TenantId, from: &str, to: &str) {
        counter!(
            TRANSFERS,
            "tenant_id" => tenant_id.to_string(),
            "from_warehouse" => from.to_string(),
            "to_warehouse" => to.to_string()
        )
        .increment(1);
    }

    pub fn damaged(&self, tenant_id: &TenantId, warehouse_id: &str, units: i64) {
        counter!(
            DAMAGED_UNITS_TOTAL,
            "tenant_id" => tenant_id.to_string(),
            "warehouse_id" => warehouse_id.to_string()
        )
        .increment(units.max(0) as u64);
    }

    pub fn stock_update(&self, tenant_id: &TenantId, warehouse_id: &str, operation: &'static str) {
        counter!(
            STOCK_UPDATES,
            "tenant_id" => tenant_id.to_string(),
            "warehouse_id" => warehouse_id.to_string(),
            "operation" => operation
        )
        .increment(1);
    }

    pub fn alert_created(&self, tenant_id: &TenantId, alert_type: AlertType, severity: Severity) {
        counter!(
            ALERTS_CREATED,
            "tenant_id" => tenant_id.to_string(),
            "alert_type" => alert_type.as_str(),
            "severity" => severity.as_str()
        )
        .increment(1);
    }

    pub fn publish_failed(&self, topic: &'static str) {
        counter!(EVENTS_PUBLISH_FAILED, "topic" => topic).increment(1);
    }

    /// Current counters of one stock record.
    pub fn record_levels(&self, record: &StockRecord) {
        let tenant_id = record.tenant_id().to_string();
        let warehouse_id = record.warehouse_id().to_string();
        let product_id = record.product_id().to_string();

        gauge!(
            TOTAL_STOCK,
            "tenant_id" => tenant_id.clone(),
            "warehouse_id" => warehouse_id.clone(),
            "product_id" => product_id.clone()
        )
        .set(record.quantity() as f64);
        gauge!(
            RESERVED_UNITS,
            "tenant_id" => tenant_id.clone(),
            "warehouse_id" => warehouse_id.clone(),
            "product_id" => product_id.clone()
        )
        .set(record.reserved() as f64);
        gauge!(
            DAMAGED_UNITS,
            "tenant_id" => tenant_id,
            "warehouse_id" => warehouse_id,
            "product_id" => product_id
        )
        .set(record.damaged() as f64);
    }

    pub fn low_stock_alerts(&self, tenant_id: &TenantId, open: u64) {
        gauge!(LOW_STOCK_ALERTS_ACTIVE, "tenant_id" => tenant_id.to_string()).set(open as f64);
    }

    pub fn reservation_duration(&self, tenant_id: &TenantId, elapsed: Duration) {
        histogram!(RESERVATION_DURATION, "tenant_id" => tenant_id.to_string())
            .record(elapsed.as_secs_f64());
    }

    pub fn stock_update_duration(&self, tenant_id: &TenantId, elapsed: Duration) {
        histogram!(STOCK_UPDATE_DURATION, "tenant_id" => tenant_id.to_string())
            .record(elapsed.as_secs_f64());
    }
}
