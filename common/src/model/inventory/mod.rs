//! Inventory models: stock keys, per-key stock levels and reservations

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a validated identifier (non-empty, no whitespace)
            pub fn new(value: impl Into<String>) -> Result<Self> {
                let value = value.into();
                if value.is_empty() || value.chars().any(char::is_whitespace) {
                    return Err(Error::ValidationError(format!(
                        "Malformed {}: {:?}",
                        $label, value
                    )));
                }
                Ok(Self(value))
            }

            /// Borrow the raw identifier
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = Error;

            fn try_from(value: String) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Stock-keeping item identifier (e.g., "MILK-1L")
    ItemId,
    "item id"
);

identifier!(
    /// Storage location identifier (e.g., "BLR-A")
    LocationId,
    "location id"
);

/// One independently lockable inventory entry
///
/// The derived ordering (item, then location) is the global lock order for
/// operations that touch two entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub item: ItemId,
    pub location: LocationId,
}

impl StockKey {
    pub fn new(item: ItemId, location: LocationId) -> Self {
        Self { item, location }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.item, self.location)
    }
}

/// On-hand and reserved counts for one stock key
///
/// Every mutator either succeeds or leaves the level untouched, and all of
/// them preserve `reserved <= on_hand`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockLevel {
    on_hand: u64,
    reserved: u64,
}

impl StockLevel {
    pub fn on_hand(&self) -> u64 {
        self.on_hand
    }

    pub fn reserved(&self) -> u64 {
        self.reserved
    }

    /// Quantity eligible for new reservations
    pub fn available(&self) -> u64 {
        self.on_hand.saturating_sub(self.reserved)
    }

    /// Add received stock
    pub fn receive(&mut self, quantity: u64) -> Result<()> {
        self.on_hand = self.on_hand.checked_add(quantity).ok_or_else(|| {
            Error::InvalidQuantity(format!("On-hand overflow adding {}", quantity))
        })?;
        Ok(())
    }

    /// Hold quantity against availability
    pub fn reserve(&mut self, quantity: u64) -> Result<()> {
        let available = self.available();
        if available < quantity {
            return Err(Error::InsufficientAvailable(format!(
                "Requested {}, available {}",
                quantity, available
            )));
        }
        self.reserved += quantity;
        Ok(())
    }

    /// Return a hold to availability
    pub fn release(&mut self, quantity: u64) -> Result<()> {
        if self.reserved < quantity {
            return Err(Error::InternalConsistency(format!(
                "Reserved underflow: releasing {} from {}",
                quantity, self.reserved
            )));
        }
        self.reserved -= quantity;
        Ok(())
    }

    /// Resolve a hold by removing the stock
    pub fn commit(&mut self, quantity: u64) -> Result<()> {
        if self.reserved < quantity {
            return Err(Error::InternalConsistency(format!(
                "Reserved underflow: committing {} from {}",
                quantity, self.reserved
            )));
        }
        if self.on_hand < quantity {
            return Err(Error::InternalConsistency(format!(
                "On-hand underflow: committing {} from {}",
                quantity, self.on_hand
            )));
        }
        self.reserved -= quantity;
        self.on_hand -= quantity;
        Ok(())
    }

    /// Correct on-hand by a signed delta; never below zero or below reserved
    pub fn adjust(&mut self, delta: i64) -> Result<()> {
        let new_on_hand = i128::from(self.on_hand) + i128::from(delta);
        if new_on_hand < 0 {
            return Err(Error::InvariantViolation(format!(
                "Adjustment {} would make on-hand negative ({})",
                delta, new_on_hand
            )));
        }
        if new_on_hand < i128::from(self.reserved) {
            return Err(Error::InvariantViolation(format!(
                "Adjustment {} would leave on-hand {} below reserved {}",
                delta, new_on_hand, self.reserved
            )));
        }
        self.on_hand = u64::try_from(new_on_hand).map_err(|_| {
            Error::InvalidQuantity(format!("On-hand overflow adjusting by {}", delta))
        })?;
        Ok(())
    }

    /// Remove unreserved stock (the source side of a transfer)
    pub fn withdraw_available(&mut self, quantity: u64) -> Result<()> {
        let available = self.available();
        if available < quantity {
            return Err(Error::InsufficientAvailable(format!(
                "Requested {}, available {}",
                quantity, available
            )));
        }
        self.on_hand -= quantity;
        Ok(())
    }
}

/// Point-in-time copy of a stock level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub key: StockKey,
    pub on_hand: u64,
    pub reserved: u64,
}

impl StockSnapshot {
    pub fn of(key: StockKey, level: &StockLevel) -> Self {
        Self {
            key,
            on_hand: level.on_hand(),
            reserved: level.reserved(),
        }
    }

    pub fn available(&self) -> u64 {
        self.on_hand.saturating_sub(self.reserved)
    }
}

/// Reservation identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A hold against available stock, alive until committed or released
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub key: StockKey,
    pub quantity: u64,
    /// Caller reference (e.g., "order:42")
    pub reference: String,
    pub created_at: DateTime<Utc>,
}
