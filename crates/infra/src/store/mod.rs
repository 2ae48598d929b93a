//! Stock, warehouse and alert persistence.
//!
//! The stock store is the only shared mutable resource. Every mutation of a
//! record runs under that record's lock (a per-key async mutex in memory,
//! `SELECT ... FOR UPDATE` in Postgres) so concurrent writers to the same
//! (tenant, warehouse, product) are serialized and never observe the same
//! `available` value. Different keys never contend.
//!
//! Stores do not publish events; services publish after the store call returns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stockledger_core::{AlertId, DomainError, ProductId, TenantId, WarehouseId};
use stockledger_inventory::{
    AlertType, StockAlert, StockChange, StockCommand, StockError, StockKey, StockRecord, Transfer,
    Warehouse,
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryAlertStore, InMemoryStockStore, InMemoryWarehouseStore};
pub use postgres::{PostgresAlertStore, PostgresStockStore, PostgresWarehouseStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("warehouse has active reservations")]
    ActiveReservations,

    #[error(transparent)]
    Stock(#[from] StockError),

    /// Lock wait or backend availability problem; the caller may retry.
    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        StoreError::Stock(err.into())
    }
}

/// What `StockStore::apply` does when the record does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    Fail,
    /// Create an empty record with this reorder level, then apply the command.
    /// The record is not kept if the command fails.
    Create { reorder_level: i64 },
}

#[async_trait]
pub trait StockStore: Send + Sync {
    async fn get(&self, key: &StockKey) -> Result<Option<StockRecord>, StoreError>;

    async fn list_for_product(
        &self,
        tenant_id: &TenantId,
        product_id: &ProductId,
    ) -> Result<Vec<StockRecord>, StoreError>;

    /// Records of one warehouse, most recently updated first.
    async fn list_for_warehouse(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
        limit: Option<usize>,
    ) -> Result<Vec<StockRecord>, StoreError>;

    /// Atomically read, mutate and write one record.
    async fn apply(
        &self,
        key: &StockKey,
        command: StockCommand,
        on_missing: OnMissing,
    ) -> Result<StockChange, StoreError>;

    /// Move available units between two warehouses of the same product.
    ///
    /// Both rows are locked in key order; the destination is created if absent.
    async fn transfer(
        &self,
        from: &StockKey,
        to_warehouse: &WarehouseId,
        quantity: i64,
        reorder_level: i64,
    ) -> Result<Transfer, StoreError>;

    /// Delete every record of a warehouse.
    ///
    /// Fails with `ActiveReservations` (deleting nothing) if any record has reserved units.
    async fn purge_warehouse(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
    ) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait WarehouseStore: Send + Sync {
    /// Insert a new warehouse; `AlreadyExists` if the tenant already uses the name.
    async fn insert(&self, warehouse: Warehouse) -> Result<Warehouse, StoreError>;

    async fn get(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
    ) -> Result<Option<Warehouse>, StoreError>;

    async fn list(&self, tenant_id: &TenantId, active_only: bool)
    -> Result<Vec<Warehouse>, StoreError>;

    /// Replace a stored warehouse; `AlreadyExists` if renamed onto another's name.
    async fn update(&self, warehouse: Warehouse) -> Result<Warehouse, StoreError>;

    async fn delete(&self, tenant_id: &TenantId, warehouse_id: &WarehouseId)
    -> Result<(), StoreError>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Insert `alert` unless an open alert of the same type exists for its triple.
    ///
    /// Returns the stored alert, or `None` when an open one already covered it.
    async fn open_if_absent(&self, alert: StockAlert) -> Result<Option<StockAlert>, StoreError>;

    /// Newest first.
    async fn list(
        &self,
        tenant_id: &TenantId,
        include_resolved: bool,
    ) -> Result<Vec<StockAlert>, StoreError>;

    /// Resolve an alert; resolving a resolved alert returns it unchanged.
    async fn resolve(
        &self,
        tenant_id: &TenantId,
        alert_id: &AlertId,
        now: DateTime<Utc>,
    ) -> Result<StockAlert, StoreError>;

    async fn count_open(&self, tenant_id: &TenantId, alert_type: AlertType)
    -> Result<u64, StoreError>;
}
