// File: tests/concurrency_tests.rs

mod test_helpers;

use std::sync::{Arc, Barrier};
use std::thread;

use lld_core::common::error::{Error, ErrorKind};
use lld_core::common::model::order::{Side, Status};
use lld_core::inventory_service::InventoryLedger;
use lld_core::matching_engine::{EngineConfig, MatchingEngine, PriceConvention};
use rust_decimal_macros::dec;
use test_helpers::{init_tracing, item, limit, location};
use uuid::Uuid;

#[test]
fn test_symbols_trade_in_parallel() {
    init_tracing();
    let engine = Arc::new(MatchingEngine::new());
    let symbols = ["AAA", "BBB", "CCC", "DDD"];
    let barrier = Arc::new(Barrier::new(symbols.len()));

    let handles: Vec<_> = symbols
        .iter()
        .map(|symbol| {
            let engine = engine.clone();
            let barrier = barrier.clone();
            let symbol = symbol.to_string();
            thread::spawn(move || {
                let (maker, taker) = (Uuid::new_v4(), Uuid::new_v4());
                barrier.wait();
                for _ in 0..100 {
                    engine
                        .place_order(limit(maker, &symbol, Side::Sell, dec!(10), dec!(1)))
                        .unwrap();
                    let result = engine
                        .place_order(limit(taker, &symbol, Side::Buy, dec!(10), dec!(1)))
                        .unwrap();
                    assert_eq!(result.trades.len(), 1);
                    assert_eq!(result.order.status, Status::Filled);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for symbol in symbols {
        assert_eq!(engine.get_trades(symbol).len(), 100);
        assert!(engine.get_open_orders(symbol).is_empty());
        assert_eq!(engine.best_bid(symbol), None);
        assert_eq!(engine.best_ask(symbol), None);
    }
}

#[test]
fn test_concurrent_cancel_and_match_settle_once() {
    init_tracing();
    let engine = Arc::new(MatchingEngine::new());
    let maker = Uuid::new_v4();

    let resting: Vec<Uuid> = (0..50)
        .map(|_| {
            engine
                .place_order(limit(maker, "XYZ", Side::Sell, dec!(20), dec!(1)))
                .unwrap()
                .order_id
        })
        .collect();

    let cancel_ids = resting.clone();
    let canceller = {
        let engine = engine.clone();
        thread::spawn(move || {
            cancel_ids
                .into_iter()
                .filter(|id| match engine.cancel_order(*id) {
                    Ok(order) => {
                        assert_eq!(order.status, Status::Cancelled);
                        true
                    }
                    Err(e) => {
                        assert_eq!(e.kind(), ErrorKind::NotCancelable);
                        false
                    }
                })
                .count()
        })
    };
    let buyer = {
        let engine = engine.clone();
        thread::spawn(move || {
            let taker = Uuid::new_v4();
            (0..50)
                .map(|_| {
                    engine
                        .place_order(limit(taker, "XYZ", Side::Buy, dec!(20), dec!(1)))
                        .unwrap()
                        .trades
                        .len()
                })
                .sum::<usize>()
        })
    };

    let cancelled = canceller.join().unwrap();
    let traded = buyer.join().unwrap();
    assert_eq!(cancelled + traded, 50);

    for id in resting {
        let order = engine.get_order(id).unwrap();
        assert!(matches!(order.status, Status::Filled | Status::Cancelled));
    }
}

#[test]
fn test_fills_drive_inventory_commits() {
    init_tracing();
    let engine = MatchingEngine::with_config(EngineConfig::new(PriceConvention::Maker, 5));
    let ledger = InventoryLedger::new();
    let (sku, dc) = (item("WIDGET"), location("DC-1"));
    let (seller, buyer) = (Uuid::new_v4(), Uuid::new_v4());

    ledger.receive_stock(&sku, &dc, 10, "initial").unwrap();

    // Reserve before offering, commit what trades, release the rest
    let hold = ledger.reserve(&sku, &dc, 6, "ask#1").unwrap();
    let ask = engine
        .place_order(limit(seller, "WIDGET", Side::Sell, dec!(5), dec!(6)))
        .unwrap();
    let bid = engine
        .place_order(limit(buyer, "WIDGET", Side::Buy, dec!(5), dec!(4)))
        .unwrap();

    assert_eq!(bid.trades.len(), 1);
    let traded = bid.trades[0].quantity;
    assert_eq!(traded, dec!(4));

    let remaining = engine.cancel_order(ask.order_id).unwrap();
    assert_eq!(remaining.remaining_quantity, dec!(2));

    ledger.release(hold, "ask#1 resized").unwrap();
    let shipped = ledger.reserve(&sku, &dc, 4, "trade").unwrap();
    ledger.commit(shipped, "ship").unwrap();

    let stock = ledger.get_stock(&sku, &dc);
    assert_eq!(stock.on_hand, 6);
    assert_eq!(stock.reserved, 0);
}

#[test]
fn test_ledger_keys_do_not_contend() {
    init_tracing();
    let ledger = Arc::new(InventoryLedger::new());
    let locations: Vec<_> = (0..6).map(|i| location(&format!("L{}", i))).collect();
    let sku = item("BOLT");

    for loc in &locations {
        ledger.receive_stock(&sku, loc, 50, "init").unwrap();
    }

    let handles: Vec<_> = (0..locations.len())
        .map(|i| {
            let ledger = ledger.clone();
            let sku = sku.clone();
            let from = locations[i].clone();
            let to = locations[(i + 1) % locations.len()].clone();
            thread::spawn(move || {
                for n in 0..200 {
                    match n % 3 {
                        0 => {
                            let _ = ledger.transfer(&sku, &from, &to, 2, "ring");
                        }
                        1 => {
                            if let Ok(id) = ledger.reserve(&sku, &from, 1, "hold") {
                                ledger.release(id, "drop").unwrap();
                            }
                        }
                        _ => {
                            if let Err(e) = ledger.adjust(&sku, &from, -1, "shrink") {
                                assert!(matches!(e, Error::InvariantViolation(_)));
                            }
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for snapshot in ledger.stock_levels() {
        assert!(snapshot.reserved <= snapshot.on_hand);
        assert_eq!(snapshot.reserved, 0);
    }
}
