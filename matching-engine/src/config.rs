//! Configuration for the matching engine

use std::env;
use std::fmt;
use std::str::FromStr;

use common::decimal::Price;
use common::error::{Error, Result};
use common::model::order::Order;
use serde::{Deserialize, Serialize};

/// Which order's limit price a trade executes at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceConvention {
    /// The resting order's price, i.e. the one with the lower insertion sequence
    #[default]
    Maker,
    /// Always the sell order's price, whichever side arrived first
    SellSide,
}

impl PriceConvention {
    /// Execution price for a crossing pair (`buy.price >= sell.price`)
    pub fn execution_price(self, buy: &Order, sell: &Order) -> Price {
        match self {
            PriceConvention::Maker if buy.sequence < sell.sequence => buy.price,
            PriceConvention::Maker | PriceConvention::SellSide => sell.price,
        }
    }
}

impl FromStr for PriceConvention {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maker" => Ok(PriceConvention::Maker),
            "sell_side" | "sell-side" | "sell" => Ok(PriceConvention::SellSide),
            other => Err(Error::ConfigurationError(format!(
                "Unknown price convention: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PriceConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceConvention::Maker => f.write_str("maker"),
            PriceConvention::SellSide => f.write_str("sell_side"),
        }
    }
}

/// Configuration for the matching engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Execution price rule
    pub price_convention: PriceConvention,
    /// Number of price levels reported by default depth queries
    pub default_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            price_convention: PriceConvention::Maker,
            default_depth: 10,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration using environment variables
    ///
    /// Unset variables fall back to the defaults; set but unparsable values
    /// are a configuration error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let price_convention = match env::var("MATCHING_PRICE_CONVENTION") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.price_convention,
        };
        let default_depth = match env::var("MATCHING_DEFAULT_DEPTH") {
            Ok(value) => value.parse().map_err(|_| {
                Error::ConfigurationError(format!("Invalid MATCHING_DEFAULT_DEPTH: {}", value))
            })?,
            Err(_) => defaults.default_depth,
        };

        Ok(Self {
            price_convention,
            default_depth,
        })
    }

    /// Create a new configuration with custom values
    pub fn new(price_convention: PriceConvention, default_depth: usize) -> Self {
        Self {
            price_convention,
            default_depth,
        }
    }
}
