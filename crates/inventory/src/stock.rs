use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{OrderId, ProductId, TenantId, WarehouseId};

use crate::error::StockError;

/// Identity of a stock record: one per (tenant, warehouse, product).
///
/// The derived ordering is the canonical lock order for multi-row operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockKey {
    pub tenant_id: TenantId,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
}

impl StockKey {
    pub fn new(tenant_id: TenantId, warehouse_id: WarehouseId, product_id: ProductId) -> Self {
        Self {
            tenant_id,
            warehouse_id,
            product_id,
        }
    }

    /// Same tenant and product, different warehouse.
    pub fn in_warehouse(&self, warehouse_id: WarehouseId) -> Self {
        Self {
            tenant_id: self.tenant_id.clone(),
            warehouse_id,
            product_id: self.product_id.clone(),
        }
    }
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}:{}", self.tenant_id, self.warehouse_id, self.product_id)
    }
}

/// Per-warehouse stock counters.
///
/// Invariants (checked after every mutation):
/// - `quantity`, `reserved`, `damaged` and `reorder_level` are non-negative
/// - `reserved <= quantity`
/// - `available == quantity - reserved`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    #[serde(flatten)]
    key: StockKey,
    quantity: i64,
    reserved: i64,
    damaged: i64,
    available: i64,
    reorder_level: i64,
    updated_at: DateTime<Utc>,
}

impl StockRecord {
    /// An empty record, as created on first stock addition.
    pub fn new(key: StockKey, reorder_level: i64, now: DateTime<Utc>) -> Self {
        Self {
            key,
            quantity: 0,
            reserved: 0,
            damaged: 0,
            available: 0,
            reorder_level: reorder_level.max(0),
            updated_at: now,
        }
    }

    /// Rebuild a record from persisted counters, rejecting inconsistent rows.
    pub fn restore(
        key: StockKey,
        quantity: i64,
        reserved: i64,
        damaged: i64,
        reorder_level: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, StockError> {
        let record = Self {
            key,
            quantity,
            reserved,
            damaged,
            available: quantity - reserved,
            reorder_level,
            updated_at,
        };
        record.check_invariants()?;
        Ok(record)
    }

    pub fn key(&self) -> &StockKey {
        &self.key
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.key.tenant_id
    }

    pub fn warehouse_id(&self) -> &WarehouseId {
        &self.key.warehouse_id
    }

    pub fn product_id(&self) -> &ProductId {
        &self.key.product_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn reserved(&self) -> i64 {
        self.reserved
    }

    pub fn damaged(&self) -> i64 {
        self.damaged
    }

    pub fn available(&self) -> i64 {
        self.available
    }

    pub fn reorder_level(&self) -> i64 {
        self.reorder_level
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn check_invariants(&self) -> Result<(), StockError> {
        if self.quantity < 0 || self.reserved < 0 || self.damaged < 0 {
            return Err(StockError::invariant("stock counters cannot go negative"));
        }
        if self.reorder_level < 0 {
            return Err(StockError::invariant("reorder level cannot be negative"));
        }
        if self.reserved > self.quantity {
            return Err(StockError::invariant("reserved cannot exceed quantity"));
        }
        if self.available != self.quantity - self.reserved {
            return Err(StockError::invariant("available must equal quantity - reserved"));
        }
        Ok(())
    }

    fn recompute_available(&mut self) {
        self.available = self.quantity - self.reserved;
    }
}

/// A single-record mutation, executed under the record's lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockCommand {
    /// Move units from `available` to `reserved`, holding them for `order_id`.
    Reserve {
        order_id: Option<OrderId>,
        quantity: i64,
    },
    /// Return held units to `available`.
    Release {
        order_id: Option<OrderId>,
        quantity: i64,
    },
    /// Turn held units into a permanent deduction of `quantity`.
    Confirm {
        order_id: Option<OrderId>,
        quantity: i64,
    },
    /// Add (positive) or remove (negative) on-hand units.
    Adjust { delta: i64 },
    /// Move available units into the damaged pool.
    MarkDamaged { quantity: i64 },
    SetReorderLevel { level: i64 },
}

impl StockCommand {
    /// The order a reserve/release/confirm acts for.
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            StockCommand::Reserve { order_id, .. }
            | StockCommand::Release { order_id, .. }
            | StockCommand::Confirm { order_id, .. } => order_id.as_ref(),
            _ => None,
        }
    }

    /// Short operation name, used for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            StockCommand::Reserve { .. } => "reserve",
            StockCommand::Release { .. } => "release",
            StockCommand::Confirm { .. } => "confirm",
            StockCommand::Adjust { .. } => "adjust",
            StockCommand::MarkDamaged { .. } => "damage",
            StockCommand::SetReorderLevel { .. } => "reorder_level",
        }
    }
}

/// Outcome of a committed [`StockCommand`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockChange {
    /// Units actually moved. Signed for `Adjust`; zero for idempotent no-ops.
    pub applied: i64,
    /// The reserving order already held this item; nothing changed.
    pub already_held: bool,
    /// Units the command's order holds afterwards; zero without an order.
    pub held: i64,
    /// The record did not exist and was created for this command.
    pub created: bool,
    /// Record state after the command.
    pub record: StockRecord,
}

/// Outcome of a committed transfer between two warehouses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub quantity: i64,
    pub source: StockRecord,
    pub destination: StockRecord,
}

/// A stock record together with the per-order holds backing its `reserved` count.
///
/// Holds make reservation redelivery safe: an order reserves an item at most
/// once, and releases/confirms keyed by order only touch what that order holds.
/// `sum(holds) <= reserved` always; the remainder is reserved without an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    record: StockRecord,
    holds: BTreeMap<OrderId, i64>,
}

impl LedgerEntry {
    pub fn new(record: StockRecord) -> Self {
        Self {
            record,
            holds: BTreeMap::new(),
        }
    }

    pub fn restore(
        record: StockRecord,
        holds: impl IntoIterator<Item = (OrderId, i64)>,
    ) -> Result<Self, StockError> {
        let entry = Self {
            record,
            holds: holds.into_iter().collect(),
        };
        entry.check_invariants()?;
        Ok(entry)
    }

    pub fn record(&self) -> &StockRecord {
        &self.record
    }

    pub fn into_record(self) -> StockRecord {
        self.record
    }

    pub fn holds(&self) -> &BTreeMap<OrderId, i64> {
        &self.holds
    }

    /// Units currently held for `order_id`.
    pub fn hold(&self, order_id: &OrderId) -> i64 {
        self.holds.get(order_id).copied().unwrap_or(0)
    }

    fn held(&self) -> i64 {
        self.holds.values().fold(0, |sum, units| sum.saturating_add(*units))
    }

    pub fn check_invariants(&self) -> Result<(), StockError> {
        self.record.check_invariants()?;
        if self.holds.values().any(|units| *units <= 0) {
            return Err(StockError::invariant("holds must be positive"));
        }
        if self.held() > self.record.reserved {
            return Err(StockError::invariant("holds cannot exceed reserved"));
        }
        Ok(())
    }

    /// Run `command` against this entry.
    ///
    /// On error the entry is left exactly as it was.
    pub fn execute(
        &mut self,
        command: &StockCommand,
        now: DateTime<Utc>,
    ) -> Result<StockChange, StockError> {
        let mut next = self.clone();
        let (applied, already_held) = next.apply(command)?;

        if next != *self {
            next.record.updated_at = now;
        }
        next.check_invariants()?;
        *self = next;

        Ok(StockChange {
            applied,
            already_held,
            held: command.order_id().map_or(0, |order_id| self.hold(order_id)),
            created: false,
            record: self.record.clone(),
        })
    }

    /// Move `quantity` available units from this entry to `destination`.
    ///
    /// Both entries must belong to the same tenant and product. Either both
    /// sides change or neither does.
    pub fn transfer_to(
        &mut self,
        destination: &mut LedgerEntry,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> Result<Transfer, StockError> {
        positive(quantity)?;

        let (from, to) = (self.record.key(), destination.record.key());
        if from.tenant_id != to.tenant_id || from.product_id != to.product_id {
            return Err(StockError::validation(
                "transfer requires the same tenant and product",
            ));
        }
        if from.warehouse_id == to.warehouse_id {
            return Err(StockError::validation(
                "source and destination warehouses must differ",
            ));
        }
        if self.record.available < quantity {
            return Err(StockError::InsufficientStock {
                requested: quantity,
                available: self.record.available,
            });
        }

        let mut source = self.clone();
        source.record.quantity -= quantity;
        source.record.recompute_available();
        source.record.updated_at = now;
        source.check_invariants()?;

        let mut dest = destination.clone();
        dest.record.quantity = dest
            .record
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| StockError::validation("destination quantity would overflow"))?;
        dest.record.recompute_available();
        dest.record.updated_at = now;
        dest.check_invariants()?;

        *self = source;
        *destination = dest;

        Ok(Transfer {
            quantity,
            source: self.record.clone(),
            destination: destination.record.clone(),
        })
    }

    fn apply(&mut self, command: &StockCommand) -> Result<(i64, bool), StockError> {
        match command {
            StockCommand::Reserve { order_id, quantity } => {
                positive(*quantity)?;
                if let Some(order_id) = order_id {
                    if self.holds.contains_key(order_id) {
                        return Ok((0, true));
                    }
                }
                if self.record.available < *quantity {
                    return Err(StockError::InsufficientStock {
                        requested: *quantity,
                        available: self.record.available,
                    });
                }
                self.record.reserved += quantity;
                self.record.recompute_available();
                if let Some(order_id) = order_id {
                    self.holds.insert(order_id.clone(), *quantity);
                }
                Ok((*quantity, false))
            }
            StockCommand::Release { order_id, quantity } => {
                positive(*quantity)?;
                let n = self.take_reserved(order_id.as_ref(), *quantity);
                self.record.reserved -= n;
                self.record.recompute_available();
                self.trim_holds();
                Ok((n, false))
            }
            StockCommand::Confirm { order_id, quantity } => {
                positive(*quantity)?;
                let n = self.take_reserved(order_id.as_ref(), *quantity);
                self.record.reserved -= n;
                self.record.quantity -= n;
                self.record.recompute_available();
                self.trim_holds();
                Ok((n, false))
            }
            StockCommand::Adjust { delta } => {
                if *delta == 0 {
                    return Err(StockError::validation("delta cannot be zero"));
                }
                // Reserved units are never removed by an adjustment.
                let applied = if *delta > 0 {
                    *delta
                } else {
                    let removable = u64::try_from(self.record.available).unwrap_or(0);
                    // `available` fits in i64, so the negation cannot overflow.
                    -(delta.unsigned_abs().min(removable) as i64)
                };
                self.record.quantity = self
                    .record
                    .quantity
                    .checked_add(applied)
                    .ok_or_else(|| StockError::validation("quantity would overflow"))?;
                self.record.recompute_available();
                Ok((applied, false))
            }
            StockCommand::MarkDamaged { quantity } => {
                positive(*quantity)?;
                let n = (*quantity).min(self.record.available);
                if n <= 0 {
                    return Err(StockError::InsufficientAvailable {
                        requested: *quantity,
                        available: self.record.available,
                    });
                }
                self.record.damaged = self
                    .record
                    .damaged
                    .checked_add(n)
                    .ok_or_else(|| StockError::validation("damaged count would overflow"))?;
                self.record.quantity -= n;
                self.record.recompute_available();
                Ok((n, false))
            }
            StockCommand::SetReorderLevel { level } => {
                if *level < 0 {
                    return Err(StockError::validation("reorder level cannot be negative"));
                }
                self.record.reorder_level = *level;
                Ok((0, false))
            }
        }
    }

    /// Units a release/confirm may act on, consuming the order's hold.
    fn take_reserved(&mut self, order_id: Option<&OrderId>, requested: i64) -> i64 {
        match order_id {
            Some(order_id) => {
                let held = self.hold(order_id);
                let n = requested.min(held).min(self.record.reserved);
                if held - n > 0 {
                    self.holds.insert(order_id.clone(), held - n);
                } else {
                    self.holds.remove(order_id);
                }
                n
            }
            None => requested.min(self.record.reserved),
        }
    }

    /// Shrink holds until they fit inside `reserved` again.
    fn trim_holds(&mut self) {
        let mut excess = self.held() - self.record.reserved;
        if excess <= 0 {
            return;
        }
        self.holds.retain(|_, units| {
            if excess > 0 {
                let cut = (*units).min(excess);
                *units -= cut;
                excess -= cut;
            }
            *units > 0
        });
    }
}

fn positive(quantity: i64) -> Result<(), StockError> {
    if quantity <= 0 {
        return Err(StockError::validation("quantity must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_key(warehouse: &str) -> StockKey {
        StockKey::new(
            TenantId::parse("acme").unwrap(),
            WarehouseId::parse(warehouse).unwrap(),
            ProductId::parse("sku-1").unwrap(),
        )
    }

    fn order(id: &str) -> OrderId {
        OrderId::parse(id).unwrap()
    }

    fn entry_with(quantity: i64) -> LedgerEntry {
        let mut entry = LedgerEntry::new(StockRecord::new(test_key("w1"), 10, Utc::now()));
        if quantity > 0 {
            entry
                .execute(&StockCommand::Adjust { delta: quantity }, Utc::now())
                .unwrap();
        }
        entry
    }

    fn reserve(order_id: &str, quantity: i64) -> StockCommand {
        StockCommand::Reserve {
            order_id: Some(order(order_id)),
            quantity,
        }
    }

    #[test]
    fn reserve_moves_available_into_reserved() {
        let mut entry = entry_with(10);

        let change = entry.execute(&reserve("o-1", 8), Utc::now()).unwrap();
        assert_eq!(change.applied, 8);
        assert_eq!(entry.record().reserved(), 8);
        assert_eq!(entry.record().available(), 2);
        assert_eq!(entry.hold(&order("o-1")), 8);

        let err = entry.execute(&reserve("o-2", 8), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientStock {
                requested: 8,
                available: 2
            }
        );
        assert_eq!(entry.record().reserved(), 8);
    }

    #[test]
    fn redelivered_reservation_is_a_no_op() {
        let mut entry = entry_with(10);
        entry.execute(&reserve("o-1", 5), Utc::now()).unwrap();

        let change = entry.execute(&reserve("o-1", 5), Utc::now()).unwrap();
        assert!(change.already_held);
        assert_eq!(change.applied, 0);
        assert_eq!(change.held, 5);
        assert_eq!(entry.record().reserved(), 5);
    }

    #[test]
    fn adjust_past_i64_max_is_rejected_unchanged() {
        let mut entry = entry_with(0);
        entry
            .execute(&StockCommand::Adjust { delta: i64::MAX }, Utc::now())
            .unwrap();
        let before = entry.clone();

        let err = entry
            .execute(&StockCommand::Adjust { delta: 1 }, Utc::now())
            .unwrap_err();
        assert!(matches!(err, StockError::Validation(_)));
        assert_eq!(entry, before);
    }

    #[test]
    fn adjust_by_i64_min_removes_only_available_units() {
        let mut entry = entry_with(10);
        entry.execute(&reserve("o-1", 4), Utc::now()).unwrap();

        let change = entry
            .execute(&StockCommand::Adjust { delta: i64::MIN }, Utc::now())
            .unwrap();
        assert_eq!(change.applied, -6);
        assert_eq!(entry.record().quantity(), 4);
        assert_eq!(entry.record().reserved(), 4);
        assert_eq!(entry.record().available(), 0);
    }

    #[test]
    fn transfer_into_a_full_destination_is_rejected() {
        let mut source = entry_with(5);
        let mut destination = LedgerEntry::new(StockRecord::new(test_key("w2"), 0, Utc::now()));
        destination
            .execute(&StockCommand::Adjust { delta: i64::MAX }, Utc::now())
            .unwrap();
        let (source_before, destination_before) = (source.clone(), destination.clone());

        let err = source
            .transfer_to(&mut destination, 1, Utc::now())
            .unwrap_err();
        assert!(matches!(err, StockError::Validation(_)));
        assert_eq!(source, source_before);
        assert_eq!(destination, destination_before);
    }

    #[test]
    fn release_for_order_restores_pre_reservation_state() {
        let mut entry = entry_with(10);
        entry.execute(&reserve("o-1", 5), Utc::now()).unwrap();

        let release = StockCommand::Release {
            order_id: Some(order("o-1")),
            quantity: 5,
        };
        assert_eq!(entry.execute(&release, Utc::now()).unwrap().applied, 5);
        assert_eq!(entry.record().reserved(), 0);
        assert_eq!(entry.record().available(), 10);

        // Second delivery finds nothing held.
        assert_eq!(entry.execute(&release, Utc::now()).unwrap().applied, 0);
        assert_eq!(entry.record().available(), 10);
    }

    #[test]
    fn release_only_touches_the_orders_own_hold() {
        let mut entry = entry_with(10);
        entry.execute(&reserve("o-1", 3), Utc::now()).unwrap();
        entry.execute(&reserve("o-2", 4), Utc::now()).unwrap();

        let release = StockCommand::Release {
            order_id: Some(order("o-1")),
            quantity: 10,
        };
        assert_eq!(entry.execute(&release, Utc::now()).unwrap().applied, 3);
        assert_eq!(entry.record().reserved(), 4);
        assert_eq!(entry.hold(&order("o-2")), 4);
    }

    #[test]
    fn confirm_deducts_quantity() {
        let mut entry = entry_with(10);
        entry.execute(&reserve("o-1", 5), Utc::now()).unwrap();

        let confirm = StockCommand::Confirm {
            order_id: Some(order("o-1")),
            quantity: 5,
        };
        entry.execute(&confirm, Utc::now()).unwrap();
        assert_eq!(entry.record().quantity(), 5);
        assert_eq!(entry.record().reserved(), 0);
        assert_eq!(entry.record().available(), 5);

        assert_eq!(entry.execute(&confirm, Utc::now()).unwrap().applied, 0);
        assert_eq!(entry.record().quantity(), 5);
    }

    #[test]
    fn orderless_release_trims_holds() {
        let mut entry = entry_with(10);
        entry.execute(&reserve("o-1", 4), Utc::now()).unwrap();
        entry.execute(&reserve("o-2", 4), Utc::now()).unwrap();

        let release = StockCommand::Release {
            order_id: None,
            quantity: 6,
        };
        assert_eq!(entry.execute(&release, Utc::now()).unwrap().applied, 6);
        assert_eq!(entry.record().reserved(), 2);
        assert!(entry.holds().values().sum::<i64>() <= 2);
    }

    #[test]
    fn negative_adjustment_never_removes_reserved_units() {
        let mut entry = entry_with(10);
        entry.execute(&reserve("o-1", 7), Utc::now()).unwrap();

        let change = entry
            .execute(&StockCommand::Adjust { delta: -10 }, Utc::now())
            .unwrap();
        assert_eq!(change.applied, -3);
        assert_eq!(entry.record().quantity(), 7);
        assert_eq!(entry.record().available(), 0);
        assert_eq!(entry.record().reserved(), 7);
    }

    #[test]
    fn zero_adjustment_is_rejected() {
        let mut entry = entry_with(1);
        let err = entry
            .execute(&StockCommand::Adjust { delta: 0 }, Utc::now())
            .unwrap_err();
        assert!(matches!(err, StockError::Validation(_)));
    }

    #[test]
    fn damage_moves_at_most_available_units() {
        let mut entry = entry_with(10);
        entry.execute(&reserve("o-1", 6), Utc::now()).unwrap();

        let change = entry
            .execute(&StockCommand::MarkDamaged { quantity: 9 }, Utc::now())
            .unwrap();
        assert_eq!(change.applied, 4);
        assert_eq!(entry.record().damaged(), 4);
        assert_eq!(entry.record().quantity(), 6);
        assert_eq!(entry.record().available(), 0);

        let err = entry
            .execute(&StockCommand::MarkDamaged { quantity: 1 }, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            StockError::InsufficientAvailable {
                requested: 1,
                available: 0
            }
        );
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let mut entry = entry_with(10);
        for command in [
            reserve("o-1", 0),
            StockCommand::Release {
                order_id: None,
                quantity: -1,
            },
            StockCommand::MarkDamaged { quantity: 0 },
            StockCommand::SetReorderLevel { level: -1 },
        ] {
            let err = entry.execute(&command, Utc::now()).unwrap_err();
            assert!(matches!(err, StockError::Validation(_)), "{command:?}");
        }
    }

    #[test]
    fn transfer_requires_distinct_warehouses() {
        let mut a = entry_with(5);
        let mut same = entry_with(0);
        let err = a.transfer_to(&mut same, 1, Utc::now()).unwrap_err();
        assert!(matches!(err, StockError::Validation(_)));
    }

    #[test]
    fn failed_transfer_leaves_both_sides_untouched() {
        let mut a = entry_with(5);
        let mut b = LedgerEntry::new(StockRecord::new(test_key("w2"), 10, Utc::now()));
        let (a_before, b_before) = (a.clone(), b.clone());

        let err = a.transfer_to(&mut b, 6, Utc::now()).unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { available: 5, .. }));
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }

    #[test]
    fn restore_rejects_inconsistent_rows() {
        let err = StockRecord::restore(test_key("w1"), 3, 5, 0, 10, Utc::now()).unwrap_err();
        assert!(matches!(err, StockError::InvariantViolation(_)));

        let record = StockRecord::restore(test_key("w1"), 5, 2, 0, 10, Utc::now()).unwrap();
        let err = LedgerEntry::restore(record, [(order("o-1"), 3)]).unwrap_err();
        assert!(matches!(err, StockError::InvariantViolation(_)));
    }

    #[test]
    fn record_serializes_flat_in_camel_case() {
        let entry = entry_with(4);
        let value = serde_json::to_value(entry.record()).unwrap();
        assert_eq!(value["tenantId"], "acme");
        assert_eq!(value["warehouseId"], "w1");
        assert_eq!(value["available"], 4);
        assert_eq!(value["reorderLevel"], 10);
    }

    fn order_strategy() -> impl Strategy<Value = Option<OrderId>> {
        prop::option::of((0u8..4).prop_map(|n| order(&format!("o-{n}"))))
    }

    fn command_strategy() -> impl Strategy<Value = StockCommand> {
        prop_oneof![
            (order_strategy(), 1i64..20)
                .prop_map(|(order_id, quantity)| StockCommand::Reserve { order_id, quantity }),
            (order_strategy(), 1i64..20)
                .prop_map(|(order_id, quantity)| StockCommand::Release { order_id, quantity }),
            (order_strategy(), 1i64..20)
                .prop_map(|(order_id, quantity)| StockCommand::Confirm { order_id, quantity }),
            (-30i64..30)
                .prop_filter("non-zero delta", |d| *d != 0)
                .prop_map(|delta| StockCommand::Adjust { delta }),
            (1i64..10).prop_map(|quantity| StockCommand::MarkDamaged { quantity }),
            (0i64..20).prop_map(|level| StockCommand::SetReorderLevel { level }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any command sequence keeps every invariant, and a failed
        /// command leaves the entry unchanged.
        #[test]
        fn invariants_survive_any_command_sequence(
            initial in 0i64..50,
            commands in prop::collection::vec(command_strategy(), 1..40)
        ) {
            let mut entry = entry_with(initial);

            for command in commands {
                let before = entry.clone();
                match entry.execute(&command, Utc::now()) {
                    Ok(_) => {}
                    Err(_) => prop_assert_eq!(&entry, &before),
                }
                prop_assert!(entry.check_invariants().is_ok());
                let record = entry.record();
                prop_assert_eq!(record.available(), record.quantity() - record.reserved());
            }
        }

        /// Property: successful reservations never exceed the stock on hand.
        #[test]
        fn reservations_never_oversell(
            initial in 0i64..50,
            requests in prop::collection::vec(1i64..20, 1..20)
        ) {
            let mut entry = entry_with(initial);
            let mut reserved = 0;

            for (i, quantity) in requests.into_iter().enumerate() {
                let command = StockCommand::Reserve {
                    order_id: Some(order(&format!("o-{i}"))),
                    quantity,
                };
                if let Ok(change) = entry.execute(&command, Utc::now()) {
                    reserved += change.applied;
                }
            }

            prop_assert!(reserved <= initial);
            prop_assert_eq!(entry.record().reserved(), reserved);
            prop_assert!(entry.record().reserved() <= entry.record().quantity());
        }

        /// Property: a release delivered twice releases at most what was reserved.
        #[test]
        fn repeated_release_is_idempotent(
            initial in 1i64..50,
            quantity in 1i64..50,
            deliveries in 2usize..5
        ) {
            let mut entry = entry_with(initial);
            let reserved = entry
                .execute(&reserve("o-1", quantity), Utc::now())
                .map(|c| c.applied)
                .unwrap_or(0);

            let release = StockCommand::Release {
                order_id: Some(order("o-1")),
                quantity,
            };
            let mut released = 0;
            for _ in 0..deliveries {
                released += entry.execute(&release, Utc::now()).unwrap().applied;
            }

            prop_assert_eq!(released, reserved);
            prop_assert_eq!(entry.record().reserved(), 0);
            prop_assert_eq!(entry.record().available(), initial);
        }

        /// Property: a transfer conserves total units and moves exactly `n`
        /// available units, or changes nothing.
        #[test]
        fn transfer_conserves_units(
            source_units in 0i64..50,
            dest_units in 0i64..50,
            held in 0i64..50,
            n in 1i64..60
        ) {
            let mut a = entry_with(source_units);
            if held > 0 {
                let _ = a.execute(&reserve("o-1", held), Utc::now());
            }
            let mut b = LedgerEntry::new(StockRecord::new(test_key("w2"), 10, Utc::now()));
            if dest_units > 0 {
                b.execute(&StockCommand::Adjust { delta: dest_units }, Utc::now()).unwrap();
            }
            let (a_before, b_before) = (a.record().clone(), b.record().clone());

            match a.transfer_to(&mut b, n, Utc::now()) {
                Ok(transfer) => {
                    prop_assert_eq!(transfer.quantity, n);
                    prop_assert_eq!(
                        a.record().quantity() + b.record().quantity(),
                        a_before.quantity() + b_before.quantity()
                    );
                    prop_assert_eq!(a.record().available(), a_before.available() - n);
                    prop_assert_eq!(b.record().available(), b_before.available() + n);
                }
                Err(_) => {
                    prop_assert_eq!(a.record(), &a_before);
                    prop_assert_eq!(b.record(), &b_before);
                }
            }
        }
    }
}
