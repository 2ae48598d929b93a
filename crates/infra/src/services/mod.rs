//! Inventory application services.
//!
//! Services sequence store calls, event publication, alerting and metrics.
//! Every store mutation commits before anything is published about it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockledger_core::{DomainError, TenantId, WarehouseId};
use stockledger_inventory::{StockError, Warehouse};

use crate::config::InventorySettings;
use crate::event_bus::EventPublisher;
use crate::metrics::InventoryMetrics;
use crate::store::{
    AlertStore, InMemoryAlertStore, InMemoryStockStore, InMemoryWarehouseStore,
    PostgresAlertStore, PostgresStockStore, PostgresWarehouseStore, StockStore, StoreError,
    WarehouseStore,
};

pub mod alerting;
pub mod legacy;
pub mod reservation;
pub mod stock_level;
pub mod warehouse;

pub use alerting::Alerting;
pub use legacy::LegacyInventoryService;
pub use reservation::ReservationService;
pub use stock_level::{StockLevelService, StockLevelView};
pub use warehouse::{WarehouseDetails, WarehouseService};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("warehouse has active reservations")]
    ActiveReservations,

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("insufficient available units: requested {requested}, available {available}")]
    InsufficientAvailable { requested: i64, available: i64 },

    #[error("validation failed: {0}")]
    Validation(String),

    /// The store could not complete in time or is unavailable; retry the request.
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl ServiceError {
    /// Re-label a store `NotFound` with what was missing.
    fn missing(what: &'static str) -> impl FnOnce(StoreError) -> ServiceError {
        move |err| match err {
            StoreError::NotFound | StoreError::Stock(StockError::NotFound) => {
                ServiceError::NotFound(what)
            }
            other => other.into(),
        }
    }
}

impl From<StockError> for ServiceError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::NotFound => ServiceError::NotFound("stock record"),
            StockError::InsufficientStock {
                requested,
                available,
            } => ServiceError::InsufficientStock {
                requested,
                available,
            },
            StockError::InsufficientAvailable {
                requested,
                available,
            } => ServiceError::InsufficientAvailable {
                requested,
                available,
            },
            StockError::Validation(msg) => ServiceError::Validation(msg),
            StockError::InvariantViolation(msg) => ServiceError::Backend(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ServiceError::NotFound("stock record"),
            StoreError::AlreadyExists(msg) => ServiceError::AlreadyExists(msg),
            StoreError::ActiveReservations => ServiceError::ActiveReservations,
            StoreError::Stock(err) => err.into(),
            StoreError::Transient(msg) => ServiceError::Transient(msg),
            StoreError::Backend(msg) => ServiceError::Backend(msg),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                ServiceError::Validation(msg)
            }
        }
    }
}

/// The three stores behind the services.
#[derive(Clone)]
pub struct Stores {
    pub stock: Arc<dyn StockStore>,
    pub warehouses: Arc<dyn WarehouseStore>,
    pub alerts: Arc<dyn AlertStore>,
}

impl Stores {
    pub fn in_memory(lock_timeout: Duration) -> Self {
        Self {
            stock: Arc::new(InMemoryStockStore::with_lock_timeout(lock_timeout)),
            warehouses: Arc::new(InMemoryWarehouseStore::new()),
            alerts: Arc::new(InMemoryAlertStore::new()),
        }
    }

    pub fn postgres(pool: sqlx::PgPool, lock_timeout: Duration) -> Self {
        Self {
            stock: Arc::new(PostgresStockStore::new(pool.clone(), lock_timeout)),
            warehouses: Arc::new(PostgresWarehouseStore::new(pool.clone())),
            alerts: Arc::new(PostgresAlertStore::new(pool)),
        }
    }
}

/// Dependencies shared by every service.
#[derive(Clone)]
pub struct ServiceContext {
    pub stores: Stores,
    pub publisher: EventPublisher,
    pub metrics: InventoryMetrics,
    pub default_warehouse: WarehouseId,
    pub default_reorder_level: i64,
    /// Shared by writers that may create stock records, exclusive for warehouse deletion.
    warehouse_lifecycle: Arc<RwLock<()>>,
}

impl ServiceContext {
    pub fn new(
        stores: Stores,
        publisher: EventPublisher,
        metrics: InventoryMetrics,
        settings: &InventorySettings,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            stores,
            publisher,
            metrics,
            default_warehouse: WarehouseId::parse(&settings.default_warehouse)?,
            default_reorder_level: settings.default_reorder_level.max(0),
            warehouse_lifecycle: Arc::new(RwLock::new(())),
        })
    }

    /// Hold across the warehouse check and any store call that may create a record.
    pub(crate) async fn stock_writer(&self) -> RwLockReadGuard<'_, ()> {
        self.warehouse_lifecycle.read().await
    }

    pub(crate) async fn warehouse_removal(&self) -> RwLockWriteGuard<'_, ()> {
        self.warehouse_lifecycle.write().await
    }

    pub(crate) async fn require_warehouse(
        &self,
        tenant_id: &TenantId,
        warehouse_id: &WarehouseId,
    ) -> Result<Warehouse, ServiceError> {
        self.stores
            .warehouses
            .get(tenant_id, warehouse_id)
            .await?
            .ok_or(ServiceError::NotFound("warehouse"))
    }

    pub(crate) fn alerting(&self) -> Alerting {
        Alerting::new(
            self.stores.alerts.clone(),
            self.publisher.clone(),
            self.metrics,
        )
    }
}

/// All inventory services over one shared context.
#[derive(Clone)]
pub struct InventoryServices {
    pub stock_levels: StockLevelService,
    pub reservations: ReservationService,
    pub warehouses: WarehouseService,
    pub legacy: LegacyInventoryService,
}

impl InventoryServices {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            stock_levels: StockLevelService::new(ctx.clone()),
            reservations: ReservationService::new(ctx.clone()),
            warehouses: WarehouseService::new(ctx.clone()),
            legacy: LegacyInventoryService::new(ctx),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use stockledger_core::{ProductId, TenantId, WarehouseId};
    use stockledger_events::{EventBus, InMemoryEventBus, Subscription, TopicFilter};
    use stockledger_inventory::Warehouse;

    use super::*;
    use crate::event_bus::JsonEnvelope;

    pub struct Harness {
        pub ctx: ServiceContext,
        pub bus: Arc<InMemoryEventBus<JsonEnvelope>>,
        pub events: Subscription<JsonEnvelope>,
    }

    impl Harness {
        pub fn new() -> Self {
            let (publisher, bus) = EventPublisher::in_memory();
            let events = bus.subscribe(TopicFilter::All);
            let ctx = ServiceContext::new(
                Stores::in_memory(Duration::from_secs(1)),
                publisher,
                InventoryMetrics::new(),
                &InventorySettings::default(),
            )
            .unwrap();
            Self { ctx, bus, events }
        }

        pub fn services(&self) -> InventoryServices {
            InventoryServices::new(self.ctx.clone())
        }

        pub async fn warehouse(&self, tenant: &TenantId, id: &str) -> WarehouseId {
            let id = WarehouseId::parse(id).unwrap();
            let warehouse =
                Warehouse::new(tenant.clone(), id.clone(), id.as_str(), None, chrono::Utc::now())
                    .unwrap();
            self.ctx.stores.warehouses.insert(warehouse).await.unwrap();
            id
        }

        /// Topics published since the last drain.
        pub fn drain_topics(&mut self) -> Vec<String> {
            let mut topics = Vec::new();
            while let Ok(envelope) = self.events.try_recv() {
                topics.push(envelope.topic().to_string());
            }
            topics
        }

        pub fn drain(&mut self) -> Vec<JsonEnvelope> {
            let mut out = Vec::new();
            while let Ok(envelope) = self.events.try_recv() {
                out.push(envelope);
            }
            out
        }
    }

    pub fn tenant() -> TenantId {
        TenantId::parse("t1").unwrap()
    }

    pub fn product(id: &str) -> ProductId {
        ProductId::parse(id).unwrap()
    }
}
