//! Order models and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{precision, Price, Quantity};
use crate::error::{Error, Result};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side this order would match against
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Order has been validated but not yet inserted into a book
    Pending,
    /// Order is resting in the book with nothing filled
    Open,
    /// Order is resting in the book with some quantity filled
    PartiallyFilled,
    /// Order has been filled completely
    Filled,
    /// Order has been cancelled
    Cancelled,
}

/// A limit order request, before the engine assigns id and sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// Submitter ID
    pub user_id: Uuid,
    /// Instrument symbol (e.g., "ACME")
    pub symbol: String,
    /// Order side
    pub side: Side,
    /// Limit price
    pub price: Price,
    /// Total quantity
    pub quantity: Quantity,
}

impl NewOrder {
    /// Create a new limit order request
    pub fn new(
        user_id: Uuid,
        symbol: impl Into<String>,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            user_id,
            symbol: symbol.into(),
            side,
            price,
            quantity,
        }
    }

    /// Reject malformed requests before anything is mutated
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::InvalidOrder("Symbol must not be empty".to_string()));
        }
        if self.price <= Price::ZERO {
            return Err(Error::InvalidOrder(format!("Price must be positive, got {}", self.price)));
        }
        if self.quantity <= Quantity::ZERO {
            return Err(Error::InvalidOrder(format!(
                "Quantity must be positive, got {}",
                self.quantity
            )));
        }
        if !precision::is_valid_price(self.price) {
            return Err(Error::InvalidOrder(format!(
                "Price {} exceeds {} decimal places",
                self.price,
                precision::PRICE_PRECISION
            )));
        }
        if !precision::is_valid_quantity(self.quantity) {
            return Err(Error::InvalidOrder(format!(
                "Quantity {} exceeds {} decimal places",
                self.quantity,
                precision::QUANTITY_PRECISION
            )));
        }
        if !precision::is_price_in_range(self.price) {
            return Err(Error::InvalidOrder(format!(
                "Price {} exceeds maximum {}",
                self.price,
                precision::MAX_PRICE
            )));
        }
        if !precision::is_quantity_in_range(self.quantity) {
            return Err(Error::InvalidOrder(format!(
                "Quantity {} exceeds maximum {}",
                self.quantity,
                precision::MAX_QUANTITY
            )));
        }
        Ok(())
    }
}

/// Order model
///
/// Values handed out by the engine are snapshots; mutating them has no
/// effect on the book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID
    pub id: Uuid,
    /// Insertion sequence, the time-priority tie-break
    pub sequence: u64,
    /// Submitter ID
    pub user_id: Uuid,
    /// Instrument symbol
    pub symbol: String,
    /// Order side (buy or sell)
    pub side: Side,
    /// Limit price
    pub price: Price,
    /// Original quantity
    pub quantity: Quantity,
    /// Remaining quantity
    pub remaining_quantity: Quantity,
    /// Cumulative matched quantity
    pub filled_quantity: Quantity,
    /// Average fill price
    pub average_fill_price: Option<Price>,
    /// Current status
    pub status: Status,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a pending order from a request and its insertion sequence
    pub fn new(request: NewOrder, sequence: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            sequence,
            user_id: request.user_id,
            symbol: request.symbol,
            side: request.side,
            price: request.price,
            quantity: request.quantity,
            remaining_quantity: request.quantity,
            filled_quantity: Quantity::ZERO,
            average_fill_price: None,
            status: Status::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the order is fully filled
    pub fn is_filled(&self) -> bool {
        self.status == Status::Filled
    }

    /// Check if the order is resting (can be matched or cancelled)
    pub fn is_active(&self) -> bool {
        matches!(self.status, Status::Open | Status::PartiallyFilled)
    }

    /// Apply one execution to this order
    pub fn apply_fill(&mut self, quantity: Quantity, price: Price) -> Result<()> {
        if !self.is_active() {
            return Err(Error::InternalConsistency(format!(
                "Fill against order {} in status {:?}",
                self.id, self.status
            )));
        }
        if quantity <= Quantity::ZERO || quantity > self.remaining_quantity {
            return Err(Error::InternalConsistency(format!(
                "Fill of {} exceeds remaining {} on order {}",
                quantity, self.remaining_quantity, self.id
            )));
        }

        // Computed before any field changes so an overflow leaves the order intact
        let filled_quantity = self.filled_quantity + quantity;
        let average_fill_price = self
            .average_fill_price
            .map_or(Some(Price::ZERO), |p| p.checked_mul(self.filled_quantity))
            .zip(price.checked_mul(quantity))
            .and_then(|(before, fill)| before.checked_add(fill))
            .and_then(|total| total.checked_div(filled_quantity))
            .ok_or_else(|| {
                Error::InternalConsistency(format!(
                    "Fill of {} @ {} overflows average price of order {}",
                    quantity, price, self.id
                ))
            })?;

        self.filled_quantity = filled_quantity;
        self.remaining_quantity -= quantity;
        self.average_fill_price = Some(average_fill_price);
        self.status = if self.remaining_quantity.is_zero() {
            Status::Filled
        } else {
            Status::PartiallyFilled
        };
        self.updated_at = Utc::now();
        Ok(())
    }
}
