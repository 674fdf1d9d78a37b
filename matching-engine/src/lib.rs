//! Price-time priority matching over per-symbol order books

mod order_book;
pub mod config;
pub mod engine;

pub use config::{EngineConfig, PriceConvention};
pub use engine::{MatchingEngine, MatchingResult};
pub use order_book::OrderBook;
