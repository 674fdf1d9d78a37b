//! Domain models for the matching engine and the inventory ledger

pub mod order;
pub mod trade;
pub mod inventory;
