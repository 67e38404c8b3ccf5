//! Persistent backends for the ledger.

pub mod sled_store;

pub use sled_store::SledStore;
