//! Inventory domain module.
//!
//! This crate contains the stock ledger business rules, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Stores lock a
//! [`LedgerEntry`] and run a [`StockCommand`] against it; everything that can
//! break the numeric invariants lives here.

pub mod alert;
pub mod error;
pub mod level;
pub mod reservation;
pub mod stock;
pub mod warehouse;

pub use alert::{AlertTrigger, AlertType, Severity, StockAlert};
pub use error::StockError;
pub use level::StockLevel;
pub use reservation::{
    FailedItem, FailureReason, MovementResult, MovedItem, ReservationItem, ReservationResult,
    ReservedItem, WarehouseItem,
};
pub use stock::{LedgerEntry, StockChange, StockCommand, StockKey, StockRecord, Transfer};
pub use warehouse::{Warehouse, WarehousePatch};
