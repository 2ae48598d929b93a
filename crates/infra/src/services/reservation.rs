//! Per-item reservation, release and confirmation.
//!
//! Items are processed one at a time and independently: a failed item never
//! rolls back its siblings. Item-level failures (missing record, shortfall,
//! bad quantity) are reported in the result; store timeouts and backend errors
//! fail the whole request so the caller can retry it.
//!
//! Lines naming the same product (and warehouse) are merged before any
//! mutation, since an order holds at most one reservation per record.
//!
//! Each item is keyed by order, so redelivered requests are no-ops:
//! reserving again for the same order reports `alreadyHeld`, and releasing
//! or confirming again moves zero units.

use std::time::Instant;

use tracing::{info, instrument, warn};

use stockledger_core::{OrderId, TenantId, WarehouseId};
use stockledger_events::{InventoryEvent, ReservationMovement};
use stockledger_inventory::{
    FailedItem, FailureReason, MovedItem, MovementResult, ReservationItem, ReservationResult,
    ReservedItem, StockCommand, StockError, StockKey, WarehouseItem,
};

use super::{ServiceContext, ServiceError};
use crate::store::{OnMissing, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Movement {
    Release,
    Confirm,
}

impl Movement {
    fn command(self, order_id: Option<OrderId>, quantity: i64) -> StockCommand {
        match self {
            Movement::Release => StockCommand::Release { order_id, quantity },
            Movement::Confirm => StockCommand::Confirm { order_id, quantity },
        }
    }
}

#[derive(Clone)]
pub struct ReservationService {
    ctx: ServiceContext,
}

impl ReservationService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Reserve each item from one warehouse for `order_id`.
    #[instrument(skip(self, items), fields(items = items.len()), err)]
    pub async fn reserve_from_warehouse(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
        items: &[ReservationItem],
        order_id: &OrderId,
    ) -> Result<ReservationResult, ServiceError> {
        let started = Instant::now();
        let mut result = ReservationResult::default();

        for item in &ReservationItem::merge_lines(items) {
            let key = StockKey::new(
                tenant_id.clone(),
                warehouse_id.clone(),
                item.product_id.clone(),
            );
            let command = StockCommand::Reserve {
                order_id: Some(order_id.clone()),
                quantity: item.quantity,
            };

            match self.ctx.stores.stock.apply(&key, command, OnMissing::Fail).await {
                Ok(change) => {
                    // A redelivery reports what the order actually holds.
                    let quantity = if change.already_held {
                        change.held
                    } else {
                        change.applied
                    };
                    result.reserved.push(ReservedItem {
                        product_id: item.product_id.clone(),
                        quantity,
                        warehouse_id: warehouse_id.clone(),
                        already_held: change.already_held,
                    });
                    if change.already_held {
                        info!(key = %key, order_id = %order_id, "reservation already held");
                        continue;
                    }

                    info!(key = %key, order_id = %order_id, quantity = change.applied, available = change.record.available(), "stock reserved");
                    self.ctx
                        .metrics
                        .reservation_succeeded(tenant_id, warehouse_id.as_str());
                    self.ctx.metrics.record_levels(&change.record);
                    self.ctx
                        .publisher
                        .publish(InventoryEvent::Reserved(ReservationMovement {
                            tenant_id: tenant_id.clone(),
                            product_id: item.product_id.clone(),
                            warehouse_id: Some(warehouse_id.clone()),
                            order_id: Some(order_id.clone()),
                            quantity: change.applied,
                            available: change.record.available(),
                        }));
                    self.ctx.alerting().evaluate(&change.record).await;
                }
                Err(err) => {
                    let failed = item_failure(
                        err,
                        &item.product_id,
                        Some(warehouse_id),
                        item.quantity,
                    )?;
                    warn!(key = %key, order_id = %order_id, reason = failed.reason.as_str(), requested = item.quantity, available = ?failed.available, "reservation failed");
                    self.ctx.metrics.reservation_failed(
                        tenant_id,
                        warehouse_id.as_str(),
                        failed.reason.as_str(),
                    );
                    result.failed.push(failed);
                }
            }
        }

        self.ctx
            .metrics
            .reservation_duration(tenant_id, started.elapsed());
        Ok(result)
    }

    /// Return each item's held units to `available`.
    ///
    /// Releases `min(requested, held)`; items with nothing to release are skipped.
    #[instrument(skip(self, items), fields(items = items.len()), err)]
    pub async fn release_reservation(
        &self,
        tenant_id: &TenantId,
        items: &[WarehouseItem],
        order_id: Option<&OrderId>,
    ) -> Result<MovementResult, ServiceError> {
        self.move_held(Movement::Release, tenant_id, items, order_id)
            .await
    }

    /// Turn each item's held units into a permanent deduction of `quantity`.
    #[instrument(skip(self, items), fields(items = items.len()), err)]
    pub async fn confirm_reservation(
        &self,
        tenant_id: &TenantId,
        items: &[WarehouseItem],
        order_id: Option<&OrderId>,
    ) -> Result<MovementResult, ServiceError> {
        self.move_held(Movement::Confirm, tenant_id, items, order_id)
            .await
    }

    async fn move_held(
        &self,
        movement: Movement,
        tenant_id: &TenantId,
        items: &[WarehouseItem],
        order_id: Option<&OrderId>,
    ) -> Result<MovementResult, ServiceError> {
        let mut result = MovementResult::default();

        for item in &WarehouseItem::merge_lines(items) {
            let key = StockKey::new(
                tenant_id.clone(),
                item.warehouse_id.clone(),
                item.product_id.clone(),
            );
            let command = movement.command(order_id.cloned(), item.quantity);

            let change = match self.ctx.stores.stock.apply(&key, command, OnMissing::Fail).await {
                Ok(change) => change,
                Err(err) => {
                    let failed = item_failure(
                        err,
                        &item.product_id,
                        Some(&item.warehouse_id),
                        item.quantity,
                    )?;
                    warn!(key = %key, ?movement, reason = failed.reason.as_str(), "reservation movement failed");
                    result.failed.push(failed);
                    continue;
                }
            };

            if change.applied == 0 {
                info!(key = %key, ?movement, order_id = ?order_id, "nothing held; skipped");
                continue;
            }

            info!(key = %key, ?movement, order_id = ?order_id, quantity = change.applied, "reservation moved");
            let payload = ReservationMovement {
                tenant_id: tenant_id.clone(),
                product_id: item.product_id.clone(),
                warehouse_id: Some(item.warehouse_id.clone()),
                order_id: order_id.cloned(),
                quantity: change.applied,
                available: change.record.available(),
            };
            let event = match movement {
                Movement::Release => {
                    self.ctx
                        .metrics
                        .release_succeeded(tenant_id, item.warehouse_id.as_str());
                    InventoryEvent::Released(payload)
                }
                Movement::Confirm => {
                    self.ctx
                        .metrics
                        .confirm_succeeded(tenant_id, item.warehouse_id.as_str());
                    InventoryEvent::Confirmed(payload)
                }
            };
            self.ctx.metrics.record_levels(&change.record);
            self.ctx.publisher.publish(event);

            result.moved.push(MovedItem {
                product_id: item.product_id.clone(),
                quantity: change.applied,
                warehouse_id: item.warehouse_id.clone(),
            });
        }

        Ok(result)
    }
}

/// Per-item failure for `err`, or the request-level error it must become.
fn item_failure(
    err: StoreError,
    product_id: &stockledger_core::ProductId,
    warehouse_id: Option<&WarehouseId>,
    requested: i64,
) -> Result<FailedItem, ServiceError> {
    let stock_err = match err {
        StoreError::NotFound => StockError::NotFound,
        StoreError::Stock(err) if FailureReason::from_error(&err).is_some() => err,
        other => return Err(other.into()),
    };
    FailedItem::from_error(
        product_id.clone(),
        warehouse_id.cloned(),
        requested,
        &stock_err,
    )
    .ok_or_else(|| ServiceError::from(stock_err.clone()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::test_support::{product, tenant, Harness};
    use stockledger_core::ProductId;
    use stockledger_events::inventory;

    fn order(id: &str) -> OrderId {
        OrderId::parse(id).unwrap()
    }

    fn line(p: &str, quantity: i64) -> ReservationItem {
        ReservationItem {
            product_id: product(p),
            quantity,
        }
    }

    fn held(p: &str, quantity: i64, warehouse_id: &WarehouseId) -> WarehouseItem {
        WarehouseItem {
            product_id: product(p),
            quantity,
            warehouse_id: warehouse_id.clone(),
        }
    }

    async fn stocked(h: &Harness, quantity: i64) -> WarehouseId {
        let w1 = h.warehouse(&tenant(), "w1").await;
        h.services()
            .stock_levels
            .update_stock(&tenant(), &product("sku-1"), &w1, quantity)
            .await
            .unwrap();
        w1
    }

    async fn record(h: &Harness, w: &WarehouseId, p: &ProductId) -> stockledger_inventory::StockRecord {
        h.ctx
            .stores
            .stock
            .get(&StockKey::new(tenant(), w.clone(), p.clone()))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn partial_success_keeps_sibling_reservations() {
        let mut h = Harness::new();
        let w1 = stocked(&h, 10).await;
        h.services()
            .stock_levels
            .update_stock(&tenant(), &product("sku-2"), &w1, 2)
            .await
            .unwrap();
        h.drain();
        let service = h.services().reservations;

        let result = service
            .reserve_from_warehouse(
                &tenant(),
                &w1,
                &[line("sku-2", 5), line("sku-missing", 1), line("sku-1", 4)],
                &order("o-1"),
            )
            .await
            .unwrap();

        assert_eq!(result.reserved.len(), 1);
        assert_eq!(result.failed.len(), 2);
        assert_eq!(result.failed[0].reason, FailureReason::InsufficientStock);
        assert_eq!(result.failed[0].available, Some(2));
        assert_eq!(result.failed[1].reason, FailureReason::StockNotFound);

        let r = record(&h, &w1, &product("sku-1")).await;
        assert_eq!((r.reserved(), r.available()), (4, 6));
        assert!(h.drain_topics().contains(&inventory::RESERVED.to_string()));
    }

    #[tokio::test]
    async fn redelivered_reservation_does_not_double_reserve() {
        let h = Harness::new();
        let w1 = stocked(&h, 10).await;
        let service = h.services().reservations;

        for _ in 0..2 {
            service
                .reserve_from_warehouse(&tenant(), &w1, &[line("sku-1", 5)], &order("o-1"))
                .await
                .unwrap();
        }

        let r = record(&h, &w1, &product("sku-1")).await;
        assert_eq!(r.reserved(), 5);
    }

    #[tokio::test]
    async fn duplicate_lines_reserve_their_combined_quantity() {
        let h = Harness::new();
        let w1 = stocked(&h, 10).await;
        let service = h.services().reservations;

        let result = service
            .reserve_from_warehouse(
                &tenant(),
                &w1,
                &[line("sku-1", 3), line("sku-1", 4)],
                &order("o-1"),
            )
            .await
            .unwrap();
        assert!(result.is_complete());
        let reported: i64 = result.reserved.iter().map(|item| item.quantity).sum();
        assert_eq!(reported, 7);

        let r = record(&h, &w1, &product("sku-1")).await;
        assert_eq!((r.reserved(), r.available()), (7, 3));

        let confirmed = service
            .confirm_reservation(
                &tenant(),
                &[held("sku-1", 3, &w1), held("sku-1", 4, &w1)],
                Some(&order("o-1")),
            )
            .await
            .unwrap();
        assert_eq!(confirmed.moved.len(), 1);
        assert_eq!(confirmed.moved[0].quantity, 7);
        let r = record(&h, &w1, &product("sku-1")).await;
        assert_eq!((r.quantity(), r.reserved(), r.available()), (3, 0, 3));
    }

    #[tokio::test]
    async fn redelivery_reports_the_units_actually_held() {
        let h = Harness::new();
        let w1 = stocked(&h, 10).await;
        let service = h.services().reservations;

        service
            .reserve_from_warehouse(&tenant(), &w1, &[line("sku-1", 5)], &order("o-1"))
            .await
            .unwrap();
        let again = service
            .reserve_from_warehouse(&tenant(), &w1, &[line("sku-1", 8)], &order("o-1"))
            .await
            .unwrap();

        assert!(again.reserved[0].already_held);
        assert_eq!(again.reserved[0].quantity, 5);
    }

    #[tokio::test]
    async fn cancel_after_reserve_restores_the_record() {
        let h = Harness::new();
        let w1 = stocked(&h, 10).await;
        let service = h.services().reservations;

        service
            .reserve_from_warehouse(&tenant(), &w1, &[line("sku-1", 5)], &order("o-1"))
            .await
            .unwrap();
        let released = service
            .release_reservation(&tenant(), &[held("sku-1", 5, &w1)], Some(&order("o-1")))
            .await
            .unwrap();
        assert_eq!(released.moved[0].quantity, 5);

        let again = service
            .release_reservation(&tenant(), &[held("sku-1", 5, &w1)], Some(&order("o-1")))
            .await
            .unwrap();
        assert!(again.moved.is_empty());
        assert!(again.failed.is_empty());

        let r = record(&h, &w1, &product("sku-1")).await;
        assert_eq!((r.quantity(), r.reserved(), r.available()), (10, 0, 10));
    }

    #[tokio::test]
    async fn confirm_deducts_quantity_once() {
        let mut h = Harness::new();
        let w1 = stocked(&h, 10).await;
        let service = h.services().reservations;

        service
            .reserve_from_warehouse(&tenant(), &w1, &[line("sku-1", 5)], &order("o-1"))
            .await
            .unwrap();
        h.drain();
        for _ in 0..2 {
            service
                .confirm_reservation(&tenant(), &[held("sku-1", 5, &w1)], Some(&order("o-1")))
                .await
                .unwrap();
        }

        let r = record(&h, &w1, &product("sku-1")).await;
        assert_eq!((r.quantity(), r.reserved(), r.available()), (5, 0, 5));
        assert_eq!(
            h.drain_topics()
                .iter()
                .filter(|t| *t == inventory::CONFIRMED)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn release_of_unknown_record_is_an_item_failure() {
        let h = Harness::new();
        let w1 = h.warehouse(&tenant(), "w1").await;
        let result = h
            .services()
            .reservations
            .release_reservation(&tenant(), &[held("sku-x", 1, &w1)], Some(&order("o-1")))
            .await
            .unwrap();
        assert_eq!(result.failed[0].reason, FailureReason::StockNotFound);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_for_the_last_units_never_oversell() {
        let h = Harness::new();
        let w1 = stocked(&h, 10).await;
        let service = Arc::new(h.services().reservations);

        let mut handles = Vec::new();
        for i in 0..2 {
            let service = service.clone();
            let w1 = w1.clone();
            handles.push(tokio::spawn(async move {
                service
                    .reserve_from_warehouse(
                        &tenant(),
                        &w1,
                        &[line("sku-1", 8)],
                        &order(&format!("o-{i}")),
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut reserved = 0;
        let mut failures = Vec::new();
        for handle in handles {
            let result = handle.await.unwrap();
            reserved += result.reserved.len();
            failures.extend(result.failed);
        }
        assert_eq!(reserved, 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].available, Some(2));

        let r = record(&h, &w1, &product("sku-1")).await;
        assert_eq!((r.reserved(), r.available()), (8, 2));
    }
}
