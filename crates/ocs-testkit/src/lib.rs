//! Test doubles and fixtures shared by the scenario tests.
//!
//! Nothing here is linked into the daemon or CLI binaries.

pub mod fixtures;
pub mod memory_store;

pub use fixtures::{load_order_json, sample_order, sample_payload};
pub use memory_store::{FailingOrderStore, FailureMode, MemoryOrderStore};
