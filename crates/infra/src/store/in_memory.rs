//! In-memory stores for tests/dev.
//!
//! Stock records live behind one async mutex per key (a "slot"). The outer map
//! lock is only held long enough to look up or insert a slot, never across an
//! await, so writers to different keys never wait on each other.
//!
//! A slot leaves the map only while its lock is held. A writer that was
//! queued on a slot which left the map meanwhile looks the key up again.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockledger_core::{AlertId, ProductId, TenantId, WarehouseId};
use stockledger_inventory::{
    AlertType, LedgerEntry, StockAlert, StockChange, StockCommand, StockError, StockKey,
    StockRecord, Transfer, Warehouse,
};

use super::{AlertStore, OnMissing, StockStore, StoreError, WarehouseStore};

type Slot = Arc<Mutex<Option<LedgerEntry>>>;

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

fn poisoned() -> StoreError {
    StoreError::Backend("in-memory store lock poisoned".to_string())
}

#[derive(Debug)]
pub struct InMemoryStockStore {
    slots: RwLock<HashMap<StockKey, Slot>>,
    lock_timeout: Duration,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }

    /// Lock waits longer than `lock_timeout` fail with `StoreError::Transient`.
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            lock_timeout,
        }
    }

    fn slot(&self, key: &StockKey) -> Result<Option<Slot>, StoreError> {
        let slots = self.slots.read().map_err(|_| poisoned())?;
        Ok(slots.get(key).cloned())
    }

    fn slot_or_insert(&self, key: &StockKey) -> Result<Slot, StoreError> {
        if let Some(slot) = self.slot(key)? {
            return Ok(slot);
        }
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        Ok(slots.entry(key.clone()).or_default().clone())
    }

    /// Whether `slot` is still the map's slot for `key`.
    fn attached(&self, key: &StockKey, slot: &Slot) -> Result<bool, StoreError> {
        let slots = self.slots.read().map_err(|_| poisoned())?;
        Ok(slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)))
    }

    /// Drop an empty slot from the map. Call with the slot's guard held.
    fn detach(&self, key: &StockKey, slot: &Slot) -> Result<(), StoreError> {
        let mut slots = self.slots.write().map_err(|_| poisoned())?;
        if slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(key);
        }
        Ok(())
    }

    /// Lock the attached slot for `key`, creating one if `create` is set.
    ///
    /// A slot purged or rolled back while we waited is detached from the map;
    /// writing into it would be lost, so the lookup is retried.
    async fn lock_attached(
        &self,
        key: &StockKey,
        create: bool,
    ) -> Result<Option<(Slot, OwnedMutexGuard<Option<LedgerEntry>>)>, StoreError> {
        loop {
            let slot = if create {
                self.slot_or_insert(key)?
            } else {
                match self.slot(key)? {
                    Some(slot) => slot,
                    None => return Ok(None),
                }
            };
            let guard = self.lock(key, slot.clone()).await?;
            if self.attached(key, &slot)? {
                return Ok(Some((slot, guard)));
            }
        }
    }

    /// Live slot count, including slots whose record is being created.
    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.read().map(|slots| slots.len()).unwrap_or(0)
    }

    fn matching_slots(
        &self,
        mut filter: impl FnMut(&StockKey) -> bool,
    ) -> Result<Vec<(StockKey, Slot)>, StoreError> {
        let slots = self.slots.read().map_err(|_| poisoned())?;
        let mut matching: Vec<_> = slots
            .iter()
            .filter(|(key, _)| filter(key))
            .map(|(key, slot)| (key.clone(), slot.clone()))
            .collect();
        matching.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matching)
    }

    async fn lock(
        &self,
        key: &StockKey,
        slot: Slot,
    ) -> Result<OwnedMutexGuard<Option<LedgerEntry>>, StoreError> {
        tokio::time::timeout(self.lock_timeout, slot.lock_owned())
            .await
            .map_err(|_| StoreError::Transient(format!("timed out waiting for lock on {key}")))
    }

    async fn snapshot(&self, slots: Vec<(StockKey, Slot)>) -> Result<Vec<StockRecord>, StoreError> {
        let mut records = Vec::with_capacity(slots.len());
        for (key, slot) in slots {
            let guard = self.lock(&key, slot).await?;
            if let Some(entry) = guard.as_ref() {
                records.push(entry.record().clone());
            }
        }
        Ok(records)
    }

    /// Units held per order for `key` (test/inspection helper).
    pub async fn holds(&self, key: &StockKey) -> Result<Vec<(String, i64)>, StoreError> {
        let Some(slot) = self.slot(key)? else {
            return Ok(Vec::new());
        };
        let guard = self.lock(key, slot).await?;
        Ok(guard
            .as_ref()
            .map(|entry| {
                entry
                    .holds()
                    .iter()
                    .map(|(order, units)| (order.to_string(), *units))
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl Default for InMemoryStockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn get(&self, key: &StockKey) -> Result<Option<StockRecord>, StoreError> {
        let Some(slot) = self.slot(key)? else {
            return Ok(None);
        };
        let guard = self.lock(key, slot).await?;
        Ok(guard.as_ref().map(|entry| entry.record().clone()))
    }

    async fn list_for_product(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
    ) -> Result<Vec<StockRecord>, StoreError> {
        let slots =
            self.matching_slots(|k| &k.tenant_id == tenant_id && &k.product_id == product_id)?;
        self.snapshot(slots).await
    }

    async fn list_for_warehouse(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
        limit: Option<usize>,
    ) -> Result<Vec<StockRecord>, StoreError> {
        let slots =
            self.matching_slots(|k| &k.tenant_id == tenant_id && &k.warehouse_id == warehouse_id)?;
        let mut records = self.snapshot(slots).await?;
        records.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn apply(
        &self,
        key: &StockKey,
        command: StockCommand,
        on_missing: OnMissing,
    ) -> Result<StockChange, StoreError> {
        let create = matches!(on_missing, OnMissing::Create { .. });
        let (slot, mut guard) = self
            .lock_attached(key, create)
            .await?
            .ok_or(StoreError::NotFound)?;
        let now = Utc::now();

        let mut created = false;
        if guard.is_none() {
            let OnMissing::Create { reorder_level } = on_missing else {
                return Err(StoreError::NotFound);
            };
            *guard = Some(LedgerEntry::new(StockRecord::new(key.clone(), reorder_level, now)));
            created = true;
        }
        let Some(entry) = guard.as_mut() else {
            return Err(StoreError::NotFound);
        };

        match entry.execute(&command, now) {
            Ok(mut change) => {
                change.created = created;
                Ok(change)
            }
            Err(err) => {
                if created {
                    *guard = None;
                    self.detach(key, &slot)?;
                }
                Err(err.into())
            }
        }
    }

    async fn transfer(
        &self,
        from: &StockKey,
        to_warehouse: &WarehouseId,
        quantity: i64,
        reorder_level: i64,
    ) -> Result<Transfer, StoreError> {
        let to = from.in_warehouse(to_warehouse.clone());
        if &to == from {
            return Err(StockError::validation("source and destination warehouses must differ").into());
        }

        let (dest_slot, mut source, mut dest) = loop {
            let source_slot = self.slot(from)?.ok_or(StoreError::NotFound)?;
            let dest_slot = self.slot_or_insert(&to)?;

            // Canonical order: smaller key first.
            let (source, dest) = if *from < to {
                let source = self.lock(from, source_slot.clone()).await?;
                let dest = self.lock(&to, dest_slot.clone()).await?;
                (source, dest)
            } else {
                let dest = self.lock(&to, dest_slot.clone()).await?;
                let source = self.lock(from, source_slot.clone()).await?;
                (source, dest)
            };
            if self.attached(from, &source_slot)? && self.attached(&to, &dest_slot)? {
                break (dest_slot, source, dest);
            }
            if dest.is_none() {
                self.detach(&to, &dest_slot)?;
            }
        };

        let now = Utc::now();
        let Some(source_entry) = source.as_mut() else {
            if dest.is_none() {
                self.detach(&to, &dest_slot)?;
            }
            return Err(StoreError::NotFound);
        };
        let created = dest.is_none();
        let dest_entry = dest.get_or_insert_with(|| {
            LedgerEntry::new(StockRecord::new(to.clone(), reorder_level, now))
        });

        match source_entry.transfer_to(dest_entry, quantity, now) {
            Ok(transfer) => Ok(transfer),
            Err(err) => {
                if created {
                    *dest = None;
                    self.detach(&to, &dest_slot)?;
                }
                Err(err.into())
            }
        }
    }

    async fn purge_warehouse(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
    ) -> Result<u64, StoreError> {
        let slots =
            self.matching_slots(|k| &k.tenant_id == tenant_id && &k.warehouse_id == warehouse_id)?;

        let mut guards = Vec::with_capacity(slots.len());
        for (key, slot) in &slots {
            guards.push(self.lock(key, slot.clone()).await?);
        }
        if guards
            .iter()
            .any(|g| g.as_ref().is_some_and(|e| e.record().reserved() > 0))
        {
            return Err(StoreError::ActiveReservations);
        }

        let mut purged = 0;
        for guard in &mut guards {
            if guard.take().is_some() {
                purged += 1;
            }
        }

        // Detach while the guards are held; waiters re-check and retry.
        let mut map = self.slots.write().map_err(|_| poisoned())?;
        for (key, slot) in &slots {
            if map.get(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
                map.remove(key);
            }
        }
        drop(map);
        drop(guards);
        Ok(purged)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryWarehouseStore {
    inner: RwLock<HashMap<(TenantId, WarehouseId), Warehouse>>,
}

impl InMemoryWarehouseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn name_taken(
    map: &HashMap<(TenantId, WarehouseId), Warehouse>,
    warehouse: &Warehouse,
) -> bool {
    map.values().any(|w| {
        w.tenant_id == warehouse.tenant_id && w.id != warehouse.id && w.name == warehouse.name
    })
}

#[async_trait]
impl WarehouseStore for InMemoryWarehouseStore {
    async fn insert(&self, warehouse: Warehouse) -> Result<Warehouse, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let key = (warehouse.tenant_id.clone(), warehouse.id.clone());
        if map.contains_key(&key) || name_taken(&map, &warehouse) {
            return Err(StoreError::AlreadyExists(format!(
                "warehouse '{}'",
                warehouse.name
            )));
        }
        map.insert(key, warehouse.clone());
        Ok(warehouse)
    }

    async fn get(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
    ) -> Result<Option<Warehouse>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&(tenant_id.clone(), warehouse_id.clone())).cloned())
    }

    async fn list(
        &self,
        tenant_id: &TenantId,
        active_only: bool,
    ) -> Result<Vec<Warehouse>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut warehouses: Vec<_> = map
            .values()
            .filter(|w| &w.tenant_id == tenant_id && (!active_only || w.is_active))
            .cloned()
            .collect();
        warehouses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(warehouses)
    }

    async fn update(&self, warehouse: Warehouse) -> Result<Warehouse, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let key = (warehouse.tenant_id.clone(), warehouse.id.clone());
        if !map.contains_key(&key) {
            return Err(StoreError::NotFound);
        }
        if name_taken(&map, &warehouse) {
            return Err(StoreError::AlreadyExists(format!(
                "warehouse '{}'",
                warehouse.name
            )));
        }
        map.insert(key, warehouse.clone());
        Ok(warehouse)
    }

    async fn delete(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
    ) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(&(tenant_id.clone(), warehouse_id.clone()))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    inner: RwLock<Vec<StockAlert>>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn open_if_absent(&self, alert: StockAlert) -> Result<Option<StockAlert>, StoreError> {
        let mut alerts = self.inner.write().map_err(|_| poisoned())?;
        let duplicate = alerts.iter().any(|a| {
            !a.is_resolved
                && a.alert_type == alert.alert_type
                && a.tenant_id == alert.tenant_id
                && a.product_id == alert.product_id
                && a.warehouse_id == alert.warehouse_id
        });
        if duplicate {
            return Ok(None);
        }
        alerts.push(alert.clone());
        Ok(Some(alert))
    }

    async fn list(
        &self,
        tenant_id: &TenantId,
        include_resolved: bool,
    ) -> Result<Vec<StockAlert>, StoreError> {
        let alerts = self.inner.read().map_err(|_| poisoned())?;
        let mut listed: Vec<_> = alerts
            .iter()
            .filter(|a| &a.tenant_id == tenant_id && (include_resolved || !a.is_resolved))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn resolve(
        &self,
        tenant_id: &TenantId,
        alert_id: &AlertId,
        now: DateTime<Utc>,
    ) -> Result<StockAlert, StoreError> {
        let mut alerts = self.inner.write().map_err(|_| poisoned())?;
        let alert = alerts
            .iter_mut()
            .find(|a| &a.tenant_id == tenant_id && &a.id == alert_id)
            .ok_or(StoreError::NotFound)?;
        alert.resolve(now);
        Ok(alert.clone())
    }

    async fn count_open(
        &self,
        tenant_id: &TenantId,
        alert_type: AlertType,
    ) -> Result<u64, StoreError> {
        let alerts = self.inner.read().map_err(|_| poisoned())?;
        Ok(alerts
            .iter()
            .filter(|a| &a.tenant_id == tenant_id && a.alert_type == alert_type && !a.is_resolved)
            .count() as u64)
    }
}
