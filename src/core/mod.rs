//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Transactions (signed transfers and coinbase rewards)
//! - UTXO ledger (greedy spending with change outputs)
//! - Blocks (proof of work over the block contents)
//! - Blockchain (admission, mining, integrity checks and persistence)

pub mod block;
pub mod blockchain;
pub mod transaction;
pub mod utxo;

/// Token amounts, in indivisible units
pub type Amount = u64;

pub use block::{Block, CANCEL_CHECK_INTERVAL, GENESIS_PREVIOUS_HASH};
pub use blockchain::{Blockchain, BlockchainError, ChainState, ChainStats, Corruption};
pub use transaction::{Transaction, TransactionError, TransactionKind, TX_NONCE_RANGE};
pub use utxo::{LedgerError, SpendOutcome, Utxo, UtxoLedger, CHANGE_SUFFIX};
