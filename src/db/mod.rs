//! Database module for ledger storage.
//!
//! This module provides:
//! - Store traits consumed by the services
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - SQLite and in-memory store implementations

pub mod memory;
pub mod migrations;
pub mod repo;
pub mod store;

pub use memory::MemoryStore;
pub use migrations::init_db;
pub use repo::Repository;
pub use store::{InvestmentStore, SettingsStore, StoreError, UpdateStore, UserStore};
