//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is a precondition failure caught before any shared state
/// is mutated. Infrastructure failures are not modeled here; the engine
/// boundary wraps those separately.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed or missing required field).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A payment or receipt would overpay the target invoice.
    #[error("amount exceeds the invoice's remaining balance")]
    AmountExceedsBalance,

    /// An outbound movement would drive product stock negative.
    #[error("insufficient stock for outbound movement")]
    InsufficientStock,

    /// A bill-wise reference points to a nonexistent, foreign, or
    /// wrong-kind invoice.
    #[error("referenced invoice not found")]
    TargetNotFound,

    /// An invoice edit would shrink the total under already-allocated
    /// payments.
    #[error("invoice total is below the amount already paid")]
    TotalBelowPaid,

    /// A requested record was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflicting record already exists.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
