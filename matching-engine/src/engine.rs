use std::sync::Arc;

use common::decimal::{Price, Quantity};
use common::error::{Error, Result};
use common::ids::SequenceGenerator;
use common::model::order::{NewOrder, Order};
use common::model::trade::Trade;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::order_book::OrderBook;

/// Result of placing an order
#[derive(Debug, Clone)]
pub struct MatchingResult {
    /// ID assigned to the placed order
    pub order_id: Uuid,
    /// Snapshot of the placed order after matching
    pub order: Order,
    /// Trades generated by the placement
    pub trades: Vec<Trade>,
}

/// The matching engine responsible for processing orders and generating trades
///
/// Each symbol's book sits behind its own mutex. Placement (insert then match),
/// explicit matching and cancellation of a symbol all run inside that critical
/// section, so they are linearized per symbol while unrelated symbols proceed
/// in parallel.
pub struct MatchingEngine {
    config: EngineConfig,
    /// Map of symbols to order books
    order_books: DashMap<String, Arc<Mutex<OrderBook>>>,
    /// Order ID to symbol, for cancel and lookup
    order_index: DashMap<Uuid, String>,
    sequence: SequenceGenerator,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    /// Create a new matching engine with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a new matching engine with a specific configuration
    pub fn with_config(config: EngineConfig) -> Self {
        info!("Starting matching engine with {} pricing", config.price_convention);
        Self {
            config,
            order_books: DashMap::new(),
            order_index: DashMap::new(),
            sequence: SequenceGenerator::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn book(&self, symbol: &str) -> Option<Arc<Mutex<OrderBook>>> {
        self.order_books.get(symbol).map(|book| book.value().clone())
    }

    fn book_or_create(&self, symbol: &str) -> Arc<Mutex<OrderBook>> {
        self.order_books
            .entry(symbol.to_string())
            .or_insert_with(|| {
                info!("Opening order book: {}", symbol);
                Arc::new(Mutex::new(OrderBook::new(symbol)))
            })
            .value()
            .clone()
    }

    /// Place a limit order and match it immediately
    ///
    /// Invalid requests are rejected before any book is touched.
    pub fn place_order(&self, request: NewOrder) -> Result<MatchingResult> {
        if let Err(e) = request.validate() {
            warn!("Rejected order for {}: {}", request.symbol, e);
            return Err(e);
        }

        let book = self.book_or_create(&request.symbol);
        let mut book = book.lock();

        // Drawn under the book lock so sequence order is insertion order
        let order = Order::new(request, self.sequence.next());
        debug!(
            "Placing {:?} {} {} @ {} (seq {})",
            order.side, order.symbol, order.quantity, order.price, order.sequence
        );

        let order_id = book.insert(order)?;
        self.order_index.insert(order_id, book.symbol().to_string());

        let trades = match book.match_crossing(self.config.price_convention) {
            Ok(trades) => trades,
            Err(e) => {
                error!("Matching failed on {}: {}", book.symbol(), e);
                return Err(e);
            }
        };

        let order = book
            .order(order_id)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("Placed order {} missing", order_id)))?;

        if !trades.is_empty() {
            info!(
                "Order {} on {} produced {} trade(s), status {:?}",
                order_id,
                order.symbol,
                trades.len(),
                order.status
            );
        }

        Ok(MatchingResult {
            order_id,
            order,
            trades,
        })
    }

    /// Cancel a resting order
    pub fn cancel_order(&self, order_id: Uuid) -> Result<Order> {
        let symbol = self
            .order_index
            .get(&order_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::OrderNotFound(order_id.to_string()))?;

        let book = self
            .book(&symbol)
            .ok_or_else(|| Error::Internal(format!("Indexed book {} missing", symbol)))?;
        let cancelled = book.lock().cancel(order_id)?;

        info!("Cancelled order {} on {}", order_id, symbol);
        Ok(cancelled)
    }

    /// Match crossing orders on a symbol, returning the number of trades
    ///
    /// Placement already matches, so this only finds work if the book was
    /// left crossed. Unknown symbols yield 0.
    pub fn match_orders(&self, symbol: &str) -> Result<usize> {
        let Some(book) = self.book(symbol) else {
            return Ok(0);
        };
        let mut book = book.lock();
        if !book.is_crossed() {
            debug!("Book {} not crossed, nothing to match", symbol);
            return Ok(0);
        }
        match book.match_crossing(self.config.price_convention) {
            Ok(trades) => Ok(trades.len()),
            Err(e) => {
                error!("Matching failed on {}: {}", symbol, e);
                Err(e)
            }
        }
    }

    /// Get an order by ID, resting or archived
    pub fn get_order(&self, order_id: Uuid) -> Option<Order> {
        let symbol = self.order_index.get(&order_id)?.value().clone();
        let book = self.book(&symbol)?;
        let book = book.lock();
        book.order(order_id).cloned()
    }

    /// Resting orders on a symbol, bids best-first then asks best-first
    pub fn get_open_orders(&self, symbol: &str) -> Vec<Order> {
        self.book(symbol)
            .map(|book| book.lock().open_orders())
            .unwrap_or_default()
    }

    /// Every order a user has placed, across symbols, in placement order
    pub fn get_user_orders(&self, user_id: Uuid) -> Vec<Order> {
        let books: Vec<_> = self
            .order_books
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut orders: Vec<Order> = books
            .iter()
            .flat_map(|book| book.lock().orders_for_user(user_id))
            .collect();
        orders.sort_by_key(|order| order.sequence);
        orders
    }

    /// Trades executed on a symbol, oldest first
    pub fn get_trades(&self, symbol: &str) -> Vec<Trade> {
        self.book(symbol)
            .map(|book| book.lock().trades().to_vec())
            .unwrap_or_default()
    }

    /// Highest resting buy price, `None` when there are no bids
    pub fn best_bid(&self, symbol: &str) -> Option<Price> {
        self.book(symbol)?.lock().best_bid()
    }

    /// Lowest resting sell price, `None` when there are no asks
    pub fn best_ask(&self, symbol: &str) -> Option<Price> {
        self.book(symbol)?.lock().best_ask()
    }

    pub fn spread(&self, symbol: &str) -> Option<Price> {
        self.book(symbol)?.lock().spread()
    }

    pub fn mid_price(&self, symbol: &str) -> Option<Price> {
        self.book(symbol)?.lock().mid_price()
    }

    /// Price of the most recent trade on a symbol
    pub fn last_price(&self, symbol: &str) -> Option<Price> {
        self.book(symbol)?.lock().last_price()
    }

    /// Get market depth
    pub fn market_depth(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<(Vec<(Price, Quantity)>, Vec<(Price, Quantity)>)> {
        let book = self
            .book(symbol)
            .ok_or_else(|| Error::MarketNotFound(symbol.to_string()))?;
        let book = book.lock();
        Ok((book.bid_levels(limit), book.ask_levels(limit)))
    }

    /// Symbols with an order book, sorted
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .order_books
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        symbols.sort();
        symbols
    }
}
