use thiserror::Error;

use stockledger_core::DomainError;

/// Failures of a single stock command.
///
/// `NotFound`, `InsufficientStock` and `InsufficientAvailable` are per-item
/// outcomes; reservation flows report them in their results instead of failing
/// the whole request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("stock record not found")]
    NotFound,

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("insufficient available units: requested {requested}, available {available}")]
    InsufficientAvailable { requested: i64, available: i64 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl StockError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}

impl From<DomainError> for StockError {
    fn from(err: DomainError) -> Self {
        StockError::Validation(err.to_string())
    }
}
