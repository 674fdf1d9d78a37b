//! Property-based tests for matching invariants
//!
//! - After any placement the book is never left crossed
//! - Every trade fills both orders by exactly its quantity
//! - No order is ever filled beyond its total quantity

use std::collections::HashMap;

use common::decimal::{Price, Quantity};
use common::model::order::{NewOrder, Side, Status};
use matching_engine::MatchingEngine;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn arb_order() -> impl Strategy<Value = (Side, i64, i64)> {
    (arb_side(), 95i64..106i64, 1i64..20i64)
}

proptest! {
    #[test]
    fn prop_book_never_crossed_and_fills_conserved(
        orders in prop::collection::vec(arb_order(), 1..60)
    ) {
        let engine = MatchingEngine::new();
        let user = Uuid::new_v4();
        let mut ids = Vec::new();

        for (side, price, quantity) in orders {
            let result = engine
                .place_order(NewOrder::new(
                    user,
                    "PROP",
                    side,
                    Price::from(price),
                    Quantity::from(quantity),
                ))
                .unwrap();
            ids.push(result.order_id);

            if let (Some(bid), Some(ask)) = (engine.best_bid("PROP"), engine.best_ask("PROP")) {
                prop_assert!(bid < ask);
            }
        }

        let mut traded: HashMap<Uuid, Decimal> = HashMap::new();
        for trade in engine.get_trades("PROP") {
            prop_assert!(trade.quantity > Decimal::ZERO);
            *traded.entry(trade.buyer_order_id).or_default() += trade.quantity;
            *traded.entry(trade.seller_order_id).or_default() += trade.quantity;
        }

        for id in ids {
            let order = engine.get_order(id).unwrap();
            let filled = traded.get(&id).copied().unwrap_or_default();
            prop_assert_eq!(order.filled_quantity, filled);
            prop_assert!(order.filled_quantity <= order.quantity);
            prop_assert_eq!(order.filled_quantity + order.remaining_quantity, order.quantity);
            match order.status {
                Status::Filled => prop_assert!(order.remaining_quantity.is_zero()),
                Status::Open => prop_assert!(order.filled_quantity.is_zero()),
                Status::PartiallyFilled => prop_assert!(!order.remaining_quantity.is_zero()),
                other => prop_assert!(false, "unexpected status {:?}", other),
            }
        }
    }

    #[test]
    fn prop_open_orders_only_active(
        orders in prop::collection::vec(arb_order(), 1..40),
        cancel_every in 2usize..5
    ) {
        let engine = MatchingEngine::new();
        let user = Uuid::new_v4();

        for (i, (side, price, quantity)) in orders.into_iter().enumerate() {
            let result = engine
                .place_order(NewOrder::new(user, "PROP", side, Price::from(price), Quantity::from(quantity)))
                .unwrap();
            if i % cancel_every == 0 && result.order.status != Status::Filled {
                engine.cancel_order(result.order_id).unwrap();
            }
        }

        for order in engine.get_open_orders("PROP") {
            prop_assert!(order.is_active());
            prop_assert!(order.remaining_quantity > Decimal::ZERO);
        }
    }
}
