//! Order book implementation for price-time priority matching

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::Utc;
use common::decimal::{Price, Quantity};
use common::error::{Error, Result};
use common::model::order::{Order, Side, Status};
use common::model::trade::Trade;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::config::PriceConvention;

/// One side of the order book
///
/// Price levels are kept in a `BTreeMap`; each level is a FIFO of order ids
/// in insertion-sequence order. Bids are best at the highest key, asks at the
/// lowest.
#[derive(Debug)]
pub(crate) struct BookSide {
    side: Side,
    levels: BTreeMap<Price, VecDeque<Uuid>>,
}

impl BookSide {
    /// Create a new empty side
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// Get the best price (highest bid or lowest ask)
    pub fn best_price(&self) -> Option<Price> {
        match self.side {
            Side::Buy => self.levels.keys().next_back().copied(),
            Side::Sell => self.levels.keys().next().copied(),
        }
    }

    /// The order with top price-time priority
    pub fn front(&self) -> Option<Uuid> {
        let price = self.best_price()?;
        self.levels.get(&price).and_then(|ids| ids.front().copied())
    }

    /// Append an order at the back of its price level
    fn push(&mut self, price: Price, order_id: Uuid) {
        self.levels.entry(price).or_default().push_back(order_id);
    }

    /// Remove an order by price and ID
    fn remove(&mut self, price: Price, order_id: Uuid) -> bool {
        let Some(ids) = self.levels.get_mut(&price) else {
            return false;
        };
        let Some(position) = ids.iter().position(|id| *id == order_id) else {
            return false;
        };
        ids.remove(position);
        if ids.is_empty() {
            self.levels.remove(&price);
        }
        true
    }

    /// Price levels from best to worst
    fn levels(&self) -> Box<dyn Iterator<Item = (&Price, &VecDeque<Uuid>)> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.iter().rev()),
            Side::Sell => Box::new(self.levels.iter()),
        }
    }
}

/// Order book for a single symbol
///
/// Holds the resting orders of both sides plus an archive of every filled or
/// cancelled order and the trades executed on this symbol. Only orders in
/// status `Open` or `PartiallyFilled` are present on a side.
#[derive(Debug)]
pub struct OrderBook {
    symbol: String,
    bids: BookSide,
    asks: BookSide,
    /// Every order ever inserted, resting or archived
    orders: HashMap<Uuid, Order>,
    /// Trades in execution order
    trades: Vec<Trade>,
    last_price: Option<Price>,
}

impl OrderBook {
    /// Create a new empty order book for the given symbol
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
            orders: HashMap::new(),
            trades: Vec::new(),
            last_price: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Insert a pending order as a resting order
    pub fn insert(&mut self, mut order: Order) -> Result<Uuid> {
        if order.symbol != self.symbol {
            return Err(Error::Internal(format!(
                "Order for {} routed to book {}",
                order.symbol, self.symbol
            )));
        }
        if order.status != Status::Pending || self.orders.contains_key(&order.id) {
            return Err(Error::Internal(format!("Order {} inserted twice", order.id)));
        }

        order.status = Status::Open;
        let order_id = order.id;
        self.side_mut(order.side).push(order.price, order_id);
        self.orders.insert(order_id, order);
        Ok(order_id)
    }

    /// Cancel a resting order
    pub fn cancel(&mut self, order_id: Uuid) -> Result<Order> {
        let (side, price) = match self.orders.get(&order_id) {
            None => return Err(Error::OrderNotFound(order_id.to_string())),
            Some(order) if !order.is_active() => {
                return Err(Error::OrderNotCancelable(format!(
                    "Order {} is {:?}",
                    order_id, order.status
                )))
            }
            Some(order) => (order.side, order.price),
        };

        if !self.side_mut(side).remove(price, order_id) {
            return Err(Error::Internal(format!(
                "Active order {} missing from the book",
                order_id
            )));
        }

        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| Error::Internal(format!("Order {} vanished", order_id)))?;
        order.status = Status::Cancelled;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    /// Match crossing orders until the book is no longer crossed
    ///
    /// Returns the trades executed by this call, in execution order.
    pub fn match_crossing(&mut self, convention: PriceConvention) -> Result<Vec<Trade>> {
        let mut trades = Vec::new();

        while let (Some(bid_id), Some(ask_id)) = (self.bids.front(), self.asks.front()) {
            let buy = self.resting(bid_id)?.clone();
            let sell = self.resting(ask_id)?.clone();
            if buy.price < sell.price {
                break;
            }

            let quantity = Quantity::min(buy.remaining_quantity, sell.remaining_quantity);
            let price = convention.execution_price(&buy, &sell);
            let trade = Trade::between(&buy, &sell, price, quantity)?;

            self.fill(bid_id, quantity, price)?;
            self.fill(ask_id, quantity, price)?;
            self.last_price = Some(price);

            debug!(
                "Matched {} {} @ {} (buy {}, sell {})",
                self.symbol, quantity, price, bid_id, ask_id
            );
            self.trades.push(trade.clone());
            trades.push(trade);
        }

        Ok(trades)
    }

    fn resting(&self, order_id: Uuid) -> Result<&Order> {
        self.orders
            .get(&order_id)
            .filter(|order| order.is_active())
            .ok_or_else(|| {
                Error::InternalConsistency(format!(
                    "Book {} references inactive order {}",
                    self.symbol, order_id
                ))
            })
    }

    /// Apply a fill and drop the order from its side once nothing remains
    fn fill(&mut self, order_id: Uuid, quantity: Quantity, price: Price) -> Result<()> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| Error::InternalConsistency(format!("Unknown order {}", order_id)))?;
        order.apply_fill(quantity, price)?;

        if order.is_filled() {
            let (side, limit) = (order.side, order.price);
            if !self.side_mut(side).remove(limit, order_id) {
                return Err(Error::InternalConsistency(format!(
                    "Filled order {} missing from the book",
                    order_id
                )));
            }
        }
        Ok(())
    }

    /// Get the best bid price
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    /// Get the best ask price
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Get the current spread
    pub fn spread(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Get the mid price, falling back to the last traded price
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => ask.checked_add(bid).map(|sum| sum / Decimal::TWO),
            _ => self.last_price,
        }
    }

    /// Whether the best bid meets or exceeds the best ask
    pub fn is_crossed(&self) -> bool {
        matches!((self.best_bid(), self.best_ask()), (Some(bid), Some(ask)) if bid >= ask)
    }

    pub fn last_price(&self) -> Option<Price> {
        self.last_price
    }

    /// Look up any order ever inserted into this book
    pub fn order(&self, order_id: Uuid) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// Resting orders, bids best-first then asks best-first
    pub fn open_orders(&self) -> Vec<Order> {
        self.bids
            .levels()
            .chain(self.asks.levels())
            .flat_map(|(_, ids)| ids.iter())
            .filter_map(|id| self.orders.get(id).cloned())
            .collect()
    }

    /// All orders of a user on this book, in insertion order
    pub fn orders_for_user(&self, user_id: Uuid) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.sequence);
        orders
    }

    /// Trades executed on this symbol, oldest first
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Aggregated bid levels, best first
    pub fn bid_levels(&self, limit: usize) -> Vec<(Price, Quantity)> {
        self.price_levels(&self.bids, limit)
    }

    /// Aggregated ask levels, best first
    pub fn ask_levels(&self, limit: usize) -> Vec<(Price, Quantity)> {
        self.price_levels(&self.asks, limit)
    }

    fn price_levels(&self, side: &BookSide, limit: usize) -> Vec<(Price, Quantity)> {
        side.levels()
            .take(limit)
            .map(|(price, ids)| {
                let total_quantity = ids
                    .iter()
                    .filter_map(|id| self.orders.get(id))
                    .fold(Quantity::ZERO, |total, order| {
                        total.saturating_add(order.remaining_quantity)
                    });
                (*price, total_quantity)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::order::NewOrder;
    use rust_decimal_macros::dec;

    struct Harness {
        book: OrderBook,
        sequence: u64,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                book: OrderBook::new("ACME"),
                sequence: 0,
            }
        }

        fn add(&mut self, side: Side, price: Price, quantity: Quantity) -> Uuid {
            self.sequence += 1;
            let request = NewOrder::new(Uuid::new_v4(), "ACME", side, price, quantity);
            self.book.insert(Order::new(request, self.sequence)).unwrap()
        }
    }

    #[test]
    fn test_best_prices_per_side() {
        let mut h = Harness::new();
        h.add(Side::Buy, dec!(99), dec!(1));
        h.add(Side::Buy, dec!(101), dec!(1));
        h.add(Side::Sell, dec!(105), dec!(1));
        h.add(Side::Sell, dec!(103), dec!(1));

        assert_eq!(h.book.best_bid(), Some(dec!(101)));
        assert_eq!(h.book.best_ask(), Some(dec!(103)));
        assert_eq!(h.book.spread(), Some(dec!(2)));
        assert_eq!(h.book.mid_price(), Some(dec!(102)));
        assert!(!h.book.is_crossed());
    }

    #[test]
    fn test_front_respects_time_priority() {
        let mut h = Harness::new();
        let first = h.add(Side::Sell, dec!(100), dec!(1));
        h.add(Side::Sell, dec!(100), dec!(1));
        assert_eq!(h.book.asks.front(), Some(first));
        assert_eq!(h.book.ask_levels(10), vec![(dec!(100), dec!(2))]);
    }

    #[test]
    fn test_cancel_removes_and_archives() {
        let mut h = Harness::new();
        let id = h.add(Side::Buy, dec!(100), dec!(5));

        let cancelled = h.book.cancel(id).unwrap();
        assert_eq!(cancelled.status, Status::Cancelled);
        assert!(h.book.bid_levels(10).is_empty());
        assert_eq!(h.book.best_bid(), None);
        assert_eq!(h.book.order(id).unwrap().status, Status::Cancelled);

        assert!(matches!(h.book.cancel(id), Err(Error::OrderNotCancelable(_))));
        assert!(matches!(h.book.cancel(Uuid::new_v4()), Err(Error::OrderNotFound(_))));
    }

    #[test]
    fn test_match_crossing_partial_fill() {
        let mut h = Harness::new();
        let bid_101 = h.add(Side::Buy, dec!(101), dec!(5));
        let bid_100 = h.add(Side::Buy, dec!(100), dec!(5));
        let ask = h.add(Side::Sell, dec!(100), dec!(7));

        let trades = h.book.match_crossing(PriceConvention::Maker).unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].buyer_order_id, bid_101);
        assert_eq!(trades[0].quantity, dec!(5));
        assert_eq!(trades[0].price, dec!(101));
        assert_eq!(trades[1].buyer_order_id, bid_100);
        assert_eq!(trades[1].quantity, dec!(2));

        assert_eq!(h.book.order(ask).unwrap().status, Status::Filled);
        assert_eq!(h.book.order(bid_100).unwrap().status, Status::PartiallyFilled);
        assert_eq!(h.book.bid_levels(10), vec![(dec!(100), dec!(3))]);
        assert!(h.book.ask_levels(10).is_empty());
        assert_eq!(h.book.last_price(), Some(dec!(100)));
        assert_eq!(h.book.trades().len(), 2);
    }

    #[test]
    fn test_no_match_when_not_crossed() {
        let mut h = Harness::new();
        h.add(Side::Buy, dec!(99), dec!(5));
        h.add(Side::Sell, dec!(100), dec!(5));
        assert!(h.book.match_crossing(PriceConvention::Maker).unwrap().is_empty());
        assert_eq!(h.book.open_orders().len(), 2);
    }

    #[test]
    fn test_open_orders_ordering() {
        let mut h = Harness::new();
        let b1 = h.add(Side::Buy, dec!(98), dec!(1));
        let b2 = h.add(Side::Buy, dec!(99), dec!(1));
        let a1 = h.add(Side::Sell, dec!(102), dec!(1));
        let a2 = h.add(Side::Sell, dec!(101), dec!(1));

        let ids: Vec<Uuid> = h.book.open_orders().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![b2, b1, a2, a1]);
    }

    #[test]
    fn test_insert_rejects_foreign_symbol() {
        let mut book = OrderBook::new("ACME");
        let request = NewOrder::new(Uuid::new_v4(), "OTHER", Side::Buy, dec!(1), dec!(1));
        assert!(matches!(book.insert(Order::new(request, 1)), Err(Error::Internal(_))));
    }
}
