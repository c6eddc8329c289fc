//! Action Chain: a single-node proof-of-work ledger in Rust
//!
//! This crate provides an append-only ledger featuring:
//! - Proof of Work sealing with hash-chained blocks
//! - ECDSA digital signatures (secp256k1)
//! - UTXO accounting with greedy spending and change outputs
//! - SQLite persistence with integrity checks on load
//! - A REST API and a command-line interface
//!
//! # Example
//!
//! ```rust
//! use action_chain::config::ChainConfig;
//! use action_chain::core::Blockchain;
//! use action_chain::storage::MemoryStore;
//! use action_chain::wallet::Wallet;
//!
//! // Fund a wallet from genesis
//! let alice = Wallet::new();
//! let config = ChainConfig::with_genesis_recipient(&alice.address());
//! let mut blockchain = Blockchain::open(Box::new(MemoryStore::new()), config).unwrap();
//!
//! // Send coins and mine them into a block
//! let bob = Wallet::new();
//! let tx = alice.create_transaction(&bob.address(), 30, &blockchain).unwrap();
//! blockchain.submit_transaction(tx).unwrap();
//! blockchain.mine(&alice.address(), None, 1).unwrap();
//!
//! assert_eq!(blockchain.balance_of(&bob.address()), 30);
//! assert_eq!(blockchain.balance_of(&alice.address()), 71);
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod crypto;
pub mod storage;
pub mod wallet;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use config::ChainConfig;
pub use core::{Block, Blockchain, BlockchainError, Transaction, Utxo, UtxoLedger};
pub use crypto::KeyPair;
pub use storage::{LedgerStore, MemoryStore, SqliteStore};
pub use wallet::Wallet;
