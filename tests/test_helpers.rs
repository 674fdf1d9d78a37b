// File: tests/test_helpers.rs

use std::sync::Once;

use lld_core::common::decimal::{Price, Quantity};
use lld_core::common::model::inventory::{ItemId, LocationId};
use lld_core::common::model::order::{NewOrder, Side};
use uuid::Uuid;

static TRACING: Once = Once::new();

// Route engine and ledger logs to the test writer once per binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn limit(user: Uuid, symbol: &str, side: Side, price: Price, quantity: Quantity) -> NewOrder {
    NewOrder::new(user, symbol, side, price, quantity)
}

pub fn item(id: &str) -> ItemId {
    ItemId::new(id).expect("valid item id")
}

pub fn location(id: &str) -> LocationId {
    LocationId::new(id).expect("valid location id")
}
