//! Ledger persistence interface
//!
//! The orchestrator reads persisted rows at startup and appends blocks,
//! transactions and UTXO changes as they happen. Rows mirror the
//! relational layout used by [`SqliteStore`](super::SqliteStore).

use crate::core::{Amount, Block, Transaction, TransactionKind, Utxo};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A persisted block header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRow {
    /// Identifier assigned by the store, increasing in append order
    pub id: i64,
    pub hash: String,
    pub previous_hash: String,
    pub timestamp: i64,
    pub nonce: u64,
    pub contribution: Option<String>,
}

impl BlockRow {
    pub fn from_block(id: i64, block: &Block) -> Self {
        Self {
            id,
            hash: block.hash.clone(),
            previous_hash: block.previous_hash.clone(),
            timestamp: block.timestamp,
            nonce: block.nonce,
            contribution: block.contribution.clone(),
        }
    }

    /// Rebuild the block, keeping the stored hash and nonce verbatim
    pub fn into_block(self, transactions: Vec<Transaction>) -> Block {
        Block {
            timestamp: self.timestamp,
            transactions,
            previous_hash: self.previous_hash,
            contribution: self.contribution,
            nonce: self.nonce,
            hash: self.hash,
        }
    }
}

/// A persisted transaction belonging to one block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub block_id: i64,
    pub transaction_id: String,
    pub sender: Option<String>,
    pub recipient: String,
    pub amount: Amount,
    /// JSON-encoded list of input UTXOs
    pub inputs: String,
    pub signature: Option<String>,
    pub timestamp: i64,
    pub nonce: u64,
}

impl TransactionRow {
    pub fn from_transaction(block_id: i64, tx: &Transaction) -> Result<Self, StorageError> {
        Ok(Self {
            block_id,
            transaction_id: tx.id.clone(),
            sender: tx.sender().map(str::to_string),
            recipient: tx.recipient.clone(),
            amount: tx.amount,
            inputs: serde_json::to_string(&tx.inputs)?,
            signature: tx.signature().map(str::to_string),
            timestamp: tx.timestamp,
            nonce: tx.nonce,
        })
    }

    /// Rebuild the transaction, trusting the stored ID
    pub fn into_transaction(self) -> Result<Transaction, StorageError> {
        let inputs: Vec<Utxo> = if self.inputs.is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&self.inputs)?
        };

        let kind = match self.sender {
            None => TransactionKind::Coinbase,
            Some(sender) => TransactionKind::Transfer {
                sender,
                signature: self.signature,
            },
        };

        Ok(Transaction::from_parts(
            kind,
            self.recipient,
            self.amount,
            inputs,
            self.timestamp,
            self.nonce,
            self.transaction_id,
        ))
    }
}

/// Durable storage for blocks, their transactions and the UTXO set
pub trait LedgerStore: Send {
    /// All blocks, ordered by ascending ID
    fn load_blocks(&self) -> Result<Vec<BlockRow>, StorageError>;

    /// Transactions of one block, in the order they were appended
    fn load_transactions_for_block(&self, block_id: i64)
        -> Result<Vec<TransactionRow>, StorageError>;

    /// All unspent outputs, in the order they were inserted
    fn load_utxos(&self) -> Result<Vec<Utxo>, StorageError>;

    /// Persist a block header and return its assigned ID
    fn append_block(&mut self, block: &Block) -> Result<i64, StorageError>;

    fn append_transaction(&mut self, block_id: i64, tx: &Transaction) -> Result<(), StorageError>;

    fn insert_utxo(&mut self, utxo: &Utxo) -> Result<(), StorageError>;

    /// Remove the output produced by `tx_id`
    fn delete_utxo(&mut self, tx_id: &str) -> Result<(), StorageError>;
}
