//! `stockledger-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{AlertId, OrderId, ProductId, TenantId, WarehouseId, MAX_ID_LEN};
