//! Infrastructure layer: configuration, stores, event bus adapters, services and
//! the event-driven reservation coordinator.

pub mod config;
pub mod coordinator;
pub mod event_bus;
pub mod metrics;
pub mod services;
pub mod store;


pub use config::AppConfig;
pub use coordinator::{CoordinatorError, CoordinatorHandle, ReservationCoordinator};
pub use event_bus::{EventPublisher, JsonBus, JsonEnvelope};
pub use metrics::InventoryMetrics;
pub use services::{InventoryServices, ServiceContext, ServiceError, Stores};
