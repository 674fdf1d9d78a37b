//! Inventory ledger tracking on-hand and reserved stock per item and location

pub mod service;
pub mod repository;
pub mod config;

pub use service::InventoryLedger;
pub use repository::StockStore;
pub use config::InventoryConfig;
