//! Trade models and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Amount, Price, Quantity};
use crate::error::{Error, Result};
use crate::model::order::{Order, Side};

/// Immutable record of one match between a buy and a sell order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique trade ID
    pub id: Uuid,
    /// Instrument symbol
    pub symbol: String,
    /// Price at which the trade executed
    pub price: Price,
    /// Quantity traded
    pub quantity: Quantity,
    /// Total amount (price * quantity)
    pub amount: Amount,
    /// Buyer order ID
    pub buyer_order_id: Uuid,
    /// Seller order ID
    pub seller_order_id: Uuid,
    /// Buyer user ID
    pub buyer_id: Uuid,
    /// Seller user ID
    pub seller_id: Uuid,
    /// Side of the later-sequenced order (the one that triggered the match)
    pub taker_side: Side,
    /// Timestamp when the trade occurred
    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// Create a trade between a crossing buy and sell order
    pub fn between(buy: &Order, sell: &Order, price: Price, quantity: Quantity) -> Result<Self> {
        let amount = price.checked_mul(quantity).ok_or_else(|| {
            Error::InternalConsistency(format!("Trade amount {} x {} overflows", price, quantity))
        })?;
        let taker_side = if buy.sequence > sell.sequence {
            Side::Buy
        } else {
            Side::Sell
        };
        Ok(Self {
            id: Uuid::new_v4(),
            symbol: buy.symbol.clone(),
            price,
            quantity,
            amount,
            buyer_order_id: buy.id,
            seller_order_id: sell.id,
            buyer_id: buy.user_id,
            seller_id: sell.user_id,
            taker_side,
            created_at: Utc::now(),
        })
    }
}
