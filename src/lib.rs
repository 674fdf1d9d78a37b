//! Metapackage re-exporting the workspace crates for cross-crate tests

pub use common;
pub use inventory_service;
pub use matching_engine;
