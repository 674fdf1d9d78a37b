//! Common types and utilities shared by the matching engine and the inventory ledger
//!
//! This library contains the error taxonomy, decimal aliases, the sequence
//! generator and the domain models used across the workspace crates.

pub mod error;
pub mod model;
pub mod decimal;
pub mod ids;

/// Re-export important types
pub use error::{Error, ErrorKind, Result, ErrorExt};
pub use decimal::*;
pub use ids::SequenceGenerator;
