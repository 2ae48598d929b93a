//! Reservation request/result types.
//!
//! Requests are processed per item: one item failing never rolls back its
//! siblings, so results split items into successes and failures.

use serde::{Deserialize, Serialize};

use stockledger_core::{ProductId, WarehouseId};

use crate::error::StockError;

/// A line to reserve from a warehouse chosen by the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// A line to release or confirm, naming the warehouse it was reserved in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub warehouse_id: WarehouseId,
}

impl ReservationItem {
    /// One line per product, quantities summed in first-seen order.
    ///
    /// Non-positive lines are kept apart so they still fail validation.
    pub fn merge_lines(items: &[ReservationItem]) -> Vec<ReservationItem> {
        merge_by(items, |a, b| a.product_id == b.product_id, |item| &mut item.quantity)
    }
}

impl WarehouseItem {
    /// One line per (warehouse, product), quantities summed in first-seen order.
    pub fn merge_lines(items: &[WarehouseItem]) -> Vec<WarehouseItem> {
        merge_by(
            items,
            |a, b| a.product_id == b.product_id && a.warehouse_id == b.warehouse_id,
            |item| &mut item.quantity,
        )
    }
}

fn merge_by<T: Clone>(
    items: &[T],
    same_line: impl Fn(&T, &T) -> bool,
    quantity: impl Fn(&mut T) -> &mut i64,
) -> Vec<T> {
    let mut merged: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        let mut item = item.clone();
        let extra = *quantity(&mut item);
        let mut existing = None;
        if extra > 0 {
            for line in merged.iter_mut() {
                if same_line(line, &item) && *quantity(line) > 0 {
                    existing = Some(line);
                    break;
                }
            }
        }
        match existing {
            // Saturated sums fail as shortfalls downstream.
            Some(line) => {
                let total = quantity(line);
                *total = total.saturating_add(extra);
            }
            None => merged.push(item),
        }
    }
    merged
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservedItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub warehouse_id: WarehouseId,
    /// The order already held these units (redelivered request).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub already_held: bool,
}

/// A released or confirmed line; `quantity` is what actually moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub warehouse_id: WarehouseId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    StockNotFound,
    InsufficientStock,
    InvalidQuantity,
}

impl FailureReason {
    /// Item-level reason for `err`; `None` for errors that fail the whole request.
    pub fn from_error(err: &StockError) -> Option<Self> {
        match err {
            StockError::NotFound => Some(FailureReason::StockNotFound),
            StockError::InsufficientStock { .. } | StockError::InsufficientAvailable { .. } => {
                Some(FailureReason::InsufficientStock)
            }
            StockError::Validation(_) => Some(FailureReason::InvalidQuantity),
            StockError::InvariantViolation(_) => None,
        }
    }

    /// Metric label / wire code.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::StockNotFound => "stock_not_found",
            FailureReason::InsufficientStock => "insufficient_stock",
            FailureReason::InvalidQuantity => "invalid_quantity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedItem {
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<WarehouseId>,
    pub reason: FailureReason,
    pub requested: i64,
    /// Units that were available, for shortfalls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<i64>,
}

impl FailedItem {
    /// Per-item failure for `err`, or `None` if `err` must fail the whole request.
    pub fn from_error(
        product_id: ProductId,
        warehouse_id: Option<WarehouseId>,
        requested: i64,
        err: &StockError,
    ) -> Option<Self> {
        let reason = FailureReason::from_error(err)?;
        let available = match err {
            StockError::InsufficientStock { available, .. }
            | StockError::InsufficientAvailable { available, .. } => Some(*available),
            _ => None,
        };
        Some(Self {
            product_id,
            warehouse_id,
            reason,
            requested,
            available,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResult {
    pub reserved: Vec<ReservedItem>,
    pub failed: Vec<FailedItem>,
}

impl ReservationResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of a release or confirm request.
///
/// Lines with nothing to move are skipped, so `moved` may be shorter than the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementResult {
    pub moved: Vec<MovedItem>,
    pub failed: Vec<FailedItem>,
}
