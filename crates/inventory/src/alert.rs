//! Low-stock / out-of-stock alerts.
//!
//! At most one open alert exists per (tenant, product, warehouse, type); stores
//! enforce this with a conditional insert. Alerts stay open until explicitly
//! resolved, even if stock is later replenished.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{AlertId, ProductId, TenantId, WarehouseId};

use crate::stock::{StockKey, StockRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    LowStock,
    OutOfStock,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "LOW_STOCK",
            AlertType::OutOfStock => "OUT_OF_STOCK",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "LOW_STOCK" => Some(AlertType::LowStock),
            "OUT_OF_STOCK" => Some(AlertType::OutOfStock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "warning" => Some(Severity::Warning),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

/// A threshold crossing observed on a stock record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertTrigger {
    pub key: StockKey,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub available: i64,
    pub reorder_level: i64,
}

impl AlertTrigger {
    /// Alert condition for `record`, if any.
    ///
    /// `available == 0` is out-of-stock; `0 < available <= reorder_level` is low stock.
    pub fn evaluate(record: &StockRecord) -> Option<Self> {
        let available = record.available();
        let (alert_type, severity) = if available == 0 {
            (AlertType::OutOfStock, Severity::Critical)
        } else if available <= record.reorder_level() {
            (AlertType::LowStock, Severity::Warning)
        } else {
            return None;
        };

        Some(Self {
            key: record.key().clone(),
            alert_type,
            severity,
            available,
            reorder_level: record.reorder_level(),
        })
    }

    pub fn message(&self) -> String {
        match self.alert_type {
            AlertType::OutOfStock => format!(
                "Product {} is out of stock in warehouse {}",
                self.key.product_id, self.key.warehouse_id
            ),
            AlertType::LowStock => format!(
                "Product {} low stock ({} units) in warehouse {}",
                self.key.product_id, self.available, self.key.warehouse_id
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub id: AlertId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl StockAlert {
    pub fn open(id: AlertId, trigger: &AlertTrigger, now: DateTime<Utc>) -> Self {
        Self {
            id,
            tenant_id: trigger.key.tenant_id.clone(),
            product_id: trigger.key.product_id.clone(),
            warehouse_id: trigger.key.warehouse_id.clone(),
            alert_type: trigger.alert_type,
            severity: trigger.severity,
            message: trigger.message(),
            is_resolved: false,
            created_at: now,
            resolved_at: None,
        }
    }

    /// Mark resolved. Returns `false` if it already was (the alert is unchanged).
    pub fn resolve(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_resolved {
            return false;
        }
        self.is_resolved = true;
        self.resolved_at = Some(now);
        true
    }

    /// Whether this open alert covers the same condition as `trigger`.
    pub fn covers(&self, trigger: &AlertTrigger) -> bool {
        !self.is_resolved
            && self.alert_type == trigger.alert_type
            && self.tenant_id == trigger.key.tenant_id
            && self.product_id == trigger.key.product_id
            && self.warehouse_id == trigger.key.warehouse_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stock::{LedgerEntry, StockCommand};

    fn record(quantity: i64, reorder_level: i64) -> StockRecord {
        let key = StockKey::new(
            TenantId::parse("acme").unwrap(),
            WarehouseId::parse("w1").unwrap(),
            ProductId::parse("sku-1").unwrap(),
        );
        let mut entry = LedgerEntry::new(StockRecord::new(key, reorder_level, Utc::now()));
        if quantity > 0 {
            entry
                .execute(&StockCommand::Adjust { delta: quantity }, Utc::now())
                .unwrap();
        }
        entry.into_record()
    }

    #[test]
    fn empty_stock_is_out_of_stock() {
        let trigger = AlertTrigger::evaluate(&record(0, 10)).unwrap();
        assert_eq!(trigger.alert_type, AlertType::OutOfStock);
        assert_eq!(trigger.severity, Severity::Critical);
        assert!(trigger.message().contains("out of stock"));
    }

    #[test]
    fn stock_at_reorder_level_is_low() {
        let trigger = AlertTrigger::evaluate(&record(10, 10)).unwrap();
        assert_eq!(trigger.alert_type, AlertType::LowStock);
        assert_eq!(trigger.severity, Severity::Warning);
        assert!(AlertTrigger::evaluate(&record(11, 10)).is_none());
    }

    #[test]
    fn resolving_twice_keeps_the_first_resolution() {
        let trigger = AlertTrigger::evaluate(&record(3, 10)).unwrap();
        let mut alert = StockAlert::open(AlertId::generate(), &trigger, Utc::now());
        assert!(alert.covers(&trigger));

        assert!(alert.resolve(Utc::now()));
        let first = alert.resolved_at;
        assert!(!alert.resolve(Utc::now()));
        assert_eq!(alert.resolved_at, first);
        assert!(!alert.covers(&trigger));
    }

    #[test]
    fn alert_types_use_wire_names() {
        assert_eq!(
            serde_json::to_value(AlertType::OutOfStock).unwrap(),
            serde_json::json!("OUT_OF_STOCK")
        );
        assert_eq!(AlertType::parse("LOW_STOCK"), Some(AlertType::LowStock));
        assert_eq!(Severity::parse(Severity::Critical.as_str()), Some(Severity::Critical));
    }
}
