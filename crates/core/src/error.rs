//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure the inventory engine can report to a caller. Variants are
/// deterministic business outcomes except `Store`, which wraps backend faults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. blank name, zero quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced entity is absent (or hidden because it is inactive).
    #[error("not found: {0}")]
    NotFound(String),

    /// A reservation asked for more units than the generation holds.
    #[error("insufficient stock for '{product}': requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: u32,
        available: u32,
    },

    /// A release would push a generation's stock past the representable maximum.
    #[error("stock overflow for '{product}': releasing {releasing} onto {stock}")]
    StockOverflow {
        product: String,
        releasing: u32,
        stock: u32,
    },

    /// Cancel/complete attempted on an order that is no longer pending.
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Mutation attempted on a deactivated product generation.
    #[error("product is inactive: {0}")]
    InactiveProduct(String),

    /// Deactivation attempted while a pending order still references the generation.
    #[error("product is referenced by pending orders: {0}")]
    ActiveOrderConflict(String),

    /// A write targeted a stale version (optimistic concurrency).
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// The backing store failed.
    #[error("store failure: {0}")]
    Store(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidStateTransition(msg.into())
    }

    pub fn inactive(msg: impl Into<String>) -> Self {
        Self::InactiveProduct(msg.into())
    }

    pub fn active_orders(msg: impl Into<String>) -> Self {
        Self::ActiveOrderConflict(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConcurrencyConflict(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// True for optimistic-concurrency failures (the caller may retry).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}
