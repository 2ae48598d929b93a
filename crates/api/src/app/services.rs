//! Infrastructure wiring: stores, bus, services and the order-event coordinator.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use stockledger_events::InMemoryEventBus;
use stockledger_infra::config::{AppConfig, BusBackend, BusConfig, StoreBackend};
use stockledger_infra::store::postgres;
use stockledger_infra::{
    CoordinatorHandle, EventPublisher, InventoryMetrics, InventoryServices, JsonBus, JsonEnvelope,
    ReservationCoordinator, ServiceContext, Stores,
};

/// Shared state behind every handler.
pub struct AppServices {
    pub inventory: InventoryServices,
    pub metrics: Option<PrometheusHandle>,
}

/// Running services plus the background consumer, if one was started.
pub struct Runtime {
    pub services: Arc<AppServices>,
    pub coordinator: Option<CoordinatorHandle>,
}

impl Runtime {
    pub async fn shutdown(self) {
        if let Some(coordinator) = self.coordinator {
            coordinator.shutdown().await;
        }
    }
}

pub async fn build_services(
    config: &AppConfig,
    metrics: Option<PrometheusHandle>,
) -> anyhow::Result<Runtime> {
    let lock_timeout = config.store.lock_timeout();
    let stores = match config.store.backend {
        StoreBackend::Memory => Stores::in_memory(lock_timeout),
        StoreBackend::Postgres => {
            let pool = postgres::connect(&config.store).await?;
            postgres::migrate(&pool).await?;
            info!(max_connections = config.store.max_connections, "postgres store ready");
            Stores::postgres(pool, lock_timeout)
        }
    };

    let bus: Arc<dyn JsonBus> = match config.bus.backend {
        BusBackend::Memory => Arc::new(InMemoryEventBus::<JsonEnvelope>::new()),
        BusBackend::Redis => redis_bus(&config.bus)?,
    };

    let instruments = InventoryMetrics::new();
    let publisher = EventPublisher::new(bus.clone(), instruments);
    let ctx = ServiceContext::new(stores, publisher, instruments, &config.inventory)?;

    let coordinator = if config.coordinator.enabled {
        let coordinator =
            ReservationCoordinator::new(&ctx, &config.inventory, &config.coordinator)?;
        Some(coordinator.spawn(bus.as_ref()))
    } else {
        info!("order event coordinator disabled");
        None
    };

    Ok(Runtime {
        services: Arc::new(AppServices {
            inventory: InventoryServices::new(ctx),
            metrics,
        }),
        coordinator,
    })
}

#[cfg(feature = "redis")]
fn redis_bus(config: &BusConfig) -> anyhow::Result<Arc<dyn JsonBus>> {
    let bus = stockledger_infra::event_bus::RedisStreamsEventBus::from_config(config)?;
    info!(prefix = %config.stream_prefix, group = %config.consumer_group, "redis streams bus ready");
    Ok(Arc::new(bus))
}

#[cfg(not(feature = "redis"))]
fn redis_bus(_config: &BusConfig) -> anyhow::Result<Arc<dyn JsonBus>> {
    anyhow::bail!("bus.backend = \"redis\" requires building with the `redis` feature")
}
