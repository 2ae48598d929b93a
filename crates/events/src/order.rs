//! Upstream order lifecycle events consumed by the reservation coordinator.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use stockledger_core::{OrderId, ProductId, TenantId, WarehouseId};

pub const ORDER_CREATED: &str = "order.created";
pub const ORDER_CANCELLED: &str = "order.cancelled";
pub const PAYMENT_FAILED: &str = "payment.failed";

/// Topics the coordinator subscribes to.
pub const TOPICS: [&str; 3] = [ORDER_CREATED, ORDER_CANCELLED, PAYMENT_FAILED];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Explicit warehouse routing for this line, if the order service chose one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<WarehouseId>,
}

/// Minimum order shape shared by all lifecycle topics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    #[serde(alias = "orderId")]
    pub id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<WarehouseId>,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

impl OrderPayload {
    /// Tenant named by the payload, or `fallback` when the producer omitted it.
    pub fn tenant_or(&self, fallback: &TenantId) -> TenantId {
        self.tenant_id.clone().unwrap_or_else(|| fallback.clone())
    }
}

/// Closed set of lifecycle events; one coordinator handler per variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderLifecycleEvent {
    Created(OrderPayload),
    Cancelled(OrderPayload),
    PaymentFailed(OrderPayload),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EventDecodeError {
    #[error("unsupported topic: {0}")]
    UnsupportedTopic(String),

    #[error("malformed {topic} payload: {reason}")]
    Malformed { topic: String, reason: String },
}

impl OrderLifecycleEvent {
    pub fn decode(topic: &str, payload: &JsonValue) -> Result<Self, EventDecodeError> {
        let wrap: fn(OrderPayload) -> Self = match topic {
            ORDER_CREATED => Self::Created,
            ORDER_CANCELLED => Self::Cancelled,
            PAYMENT_FAILED => Self::PaymentFailed,
            other => return Err(EventDecodeError::UnsupportedTopic(other.to_string())),
        };

        let order = OrderPayload::deserialize(payload).map_err(|e| EventDecodeError::Malformed {
            topic: topic.to_string(),
            reason: e.to_string(),
        })?;

        Ok(wrap(order))
    }

    pub fn topic(&self) -> &'static str {
        match self {
            Self::Created(_) => ORDER_CREATED,
            Self::Cancelled(_) => ORDER_CANCELLED,
            Self::PaymentFailed(_) => PAYMENT_FAILED,
        }
    }

    pub fn order(&self) -> &OrderPayload {
        match self {
            Self::Created(order) | Self::Cancelled(order) | Self::PaymentFailed(order) => order,
        }
    }
}
