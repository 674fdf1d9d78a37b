//! Error types for the matching engine and the inventory ledger
//!
//! Every fallible operation in the workspace returns [`Result`]. Variants are
//! grouped into a small set of [`ErrorKind`]s so callers can decide whether to
//! correct their input, treat the target as already resolved, retry later, or
//! report a bug.

use std::fmt::Display;
use thiserror::Error;

/// Workspace error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Order parameters rejected before insertion
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Inventory quantity rejected (zero, or arithmetic overflow)
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Malformed identifier or reference
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error when an order cannot be found
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Order exists but is already filled or cancelled
    #[error("Order not cancelable: {0}")]
    OrderNotCancelable(String),

    /// Error when a market has never been traded
    #[error("Market not found: {0}")]
    MarketNotFound(String),

    /// Unknown or already resolved reservation
    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),

    /// Not enough available stock to satisfy a reservation or transfer
    #[error("Insufficient available: {0}")]
    InsufficientAvailable(String),

    /// An operation would break `0 <= reserved <= on_hand`
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Internal bookkeeping is already inconsistent (e.g. reserved underflow)
    #[error("Internal consistency failure: {0}")]
    InternalConsistency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`Error`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input was wrong; nothing was mutated
    InvalidParameters,
    /// Unknown id; treat as already resolved or never existed
    NotFound,
    /// Order is known but no longer resting
    NotCancelable,
    /// Not enough stock right now; retry later or elsewhere
    InsufficientAvailable,
    /// Consistency check failed
    InvariantViolation,
    /// Configuration or other internal failure
    Internal,
}

impl Error {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidOrder(_) | Error::InvalidQuantity(_) | Error::ValidationError(_) => {
                ErrorKind::InvalidParameters
            }
            Error::OrderNotFound(_) | Error::MarketNotFound(_) | Error::ReservationNotFound(_) => {
                ErrorKind::NotFound
            }
            Error::OrderNotCancelable(_) => ErrorKind::NotCancelable,
            Error::InsufficientAvailable(_) => ErrorKind::InsufficientAvailable,
            Error::InvariantViolation(_) | Error::InternalConsistency(_) => {
                ErrorKind::InvariantViolation
            }
            Error::ConfigurationError(_) | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the error signals a bug in the core rather than a caller mistake
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InternalConsistency(_))
    }

    fn map_message(self, f: impl FnOnce(String) -> String) -> Self {
        match self {
            Error::InvalidOrder(msg) => Error::InvalidOrder(f(msg)),
            Error::InvalidQuantity(msg) => Error::InvalidQuantity(f(msg)),
            Error::ValidationError(msg) => Error::ValidationError(f(msg)),
            Error::OrderNotFound(msg) => Error::OrderNotFound(f(msg)),
            Error::OrderNotCancelable(msg) => Error::OrderNotCancelable(f(msg)),
            Error::MarketNotFound(msg) => Error::MarketNotFound(f(msg)),
            Error::ReservationNotFound(msg) => Error::ReservationNotFound(f(msg)),
            Error::InsufficientAvailable(msg) => Error::InsufficientAvailable(f(msg)),
            Error::InvariantViolation(msg) => Error::InvariantViolation(f(msg)),
            Error::InternalConsistency(msg) => Error::InternalConsistency(f(msg)),
            Error::ConfigurationError(msg) => Error::ConfigurationError(f(msg)),
            Error::Internal(msg) => Error::Internal(f(msg)),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait to add context to error results
pub trait ErrorExt<T> {
    /// Add context information to an error
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display;
}

impl<T> ErrorExt<T> for Result<T> {
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display,
    {
        self.map_err(|e| {
            let context = context_fn().to_string();
            e.map_message(|msg| format!("{}: {}", context, msg))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::InsufficientAvailable("need 5, have 4".to_string());
        assert_eq!(error.to_string(), "Insufficient available: need 5, have 4");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::InvalidQuantity("0".into()).kind(), ErrorKind::InvalidParameters);
        assert_eq!(Error::ReservationNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::OrderNotCancelable("x".into()).kind(), ErrorKind::NotCancelable);
        assert_eq!(Error::InvariantViolation("x".into()).kind(), ErrorKind::InvariantViolation);
        assert!(Error::InternalConsistency("reserved underflow".into()).is_fatal());
        assert_eq!(
            Error::InternalConsistency("x".into()).kind(),
            ErrorKind::InvariantViolation
        );
        assert!(!Error::InvariantViolation("adjust".into()).is_fatal());
    }

    #[test]
    fn test_with_context_keeps_variant() {
        let result: Result<()> = Err(Error::OrderNotFound("abc".to_string()));
        let err = result.with_context(|| "cancel").unwrap_err();
        assert_eq!(err, Error::OrderNotFound("cancel: abc".to_string()));
    }
}
