//! Decimal type utilities for precise order pricing

use rust_decimal::Decimal;
pub use rust_decimal_macros::dec;

/// Price type with high precision
pub type Price = Decimal;

/// Quantity type with high precision
pub type Quantity = Decimal;

/// Amount type with high precision (typically Price * Quantity)
pub type Amount = Decimal;

/// Precision helpers for common operations
pub mod precision {
    use super::*;

    /// Maximum price precision (8 decimal places)
    pub const PRICE_PRECISION: u32 = 8;

    /// Maximum quantity precision (8 decimal places)
    pub const QUANTITY_PRECISION: u32 = 8;

    /// Largest accepted order price
    ///
    /// With [`MAX_QUANTITY`] this keeps every notional, fill average and
    /// level total well inside `Decimal` range.
    pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

    /// Largest accepted order quantity
    pub const MAX_QUANTITY: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

    /// Whether a price fits the supported precision
    pub fn is_valid_price(price: Price) -> bool {
        price.normalize().scale() <= PRICE_PRECISION
    }

    /// Whether a quantity fits the supported precision
    pub fn is_valid_quantity(qty: Quantity) -> bool {
        qty.normalize().scale() <= QUANTITY_PRECISION
    }

    /// Whether a price is within the supported magnitude
    pub fn is_price_in_range(price: Price) -> bool {
        price <= MAX_PRICE
    }

    /// Whether a quantity is within the supported magnitude
    pub fn is_quantity_in_range(qty: Quantity) -> bool {
        qty <= MAX_QUANTITY
    }
}
