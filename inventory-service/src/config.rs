//! Configuration for the inventory ledger

use std::env;

use common::error::{Error, Result};

/// Configuration for the inventory ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryConfig {
    /// Emit an info-level audit event for every stock mutation
    pub audit_logging: bool,
    /// Longest accepted reason or reservation reference
    pub max_reference_len: usize,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            audit_logging: false,
            max_reference_len: 128,
        }
    }
}

impl InventoryConfig {
    /// Create a new configuration using environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let audit_logging = env::var("INVENTORY_AUDIT_LOGGING")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(defaults.audit_logging);
        let max_reference_len = match env::var("INVENTORY_MAX_REFERENCE_LEN") {
            Ok(value) => value.parse().map_err(|_| {
                Error::ConfigurationError(format!("Invalid INVENTORY_MAX_REFERENCE_LEN: {}", value))
            })?,
            Err(_) => defaults.max_reference_len,
        };

        Ok(Self {
            audit_logging,
            max_reference_len,
        })
    }

    /// Create a new configuration with custom values
    pub fn new(audit_logging: bool, max_reference_len: usize) -> Self {
        Self {
            audit_logging,
            max_reference_len,
        }
    }
}
