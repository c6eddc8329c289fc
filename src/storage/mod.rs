//! Storage module for ledger persistence

pub mod memory;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StorageConfig};
pub use store::{BlockRow, LedgerStore, StorageError, TransactionRow};
