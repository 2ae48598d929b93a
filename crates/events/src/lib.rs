//! Domain & integration events.
//!
//! - `inventory`: events this core publishes (`inventory.*` topics)
//! - `order`: upstream order lifecycle events this core consumes
//! - `bus`: transport-agnostic pub/sub mechanics

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;
pub mod inventory;
pub mod order;

pub use bus::{EventBus, RecvTimeoutError, Routable, Subscription, TopicFilter};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use inventory::{
    InventoryEvent, LowStock, OutOfStock, ReservationMovement, StockCreated, StockUpdated,
    TransferCompleted, UnitsDamaged,
};
pub use order::{EventDecodeError, OrderLifecycleEvent, OrderLine, OrderPayload};
