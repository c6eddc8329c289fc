//! In-memory ledger store
//!
//! Keeps rows in vectors behind a shared lock. Clones share the same
//! data, so a handle kept by a test can observe (and edit) what the
//! orchestrator wrote, or be handed to a second orchestrator to simulate
//! a restart.

use crate::core::{Block, Transaction, Utxo};
use crate::storage::store::{BlockRow, LedgerStore, StorageError, TransactionRow};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    blocks: Vec<BlockRow>,
    transactions: Vec<TransactionRow>,
    utxos: Vec<Utxo>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Apply `edit` to the stored block rows (used to simulate tampering)
    pub fn edit_blocks<F>(&self, edit: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Vec<BlockRow>),
    {
        edit(&mut self.tables()?.blocks);
        Ok(())
    }

    /// Apply `edit` to the stored transaction rows
    pub fn edit_transactions<F>(&self, edit: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Vec<TransactionRow>),
    {
        edit(&mut self.tables()?.transactions);
        Ok(())
    }

    pub fn block_count(&self) -> usize {
        self.tables().map(|t| t.blocks.len()).unwrap_or(0)
    }
}

impl LedgerStore for MemoryStore {
    fn load_blocks(&self) -> Result<Vec<BlockRow>, StorageError> {
        let mut blocks = self.tables()?.blocks.clone();
        blocks.sort_by_key(|row| row.id);
        Ok(blocks)
    }

    fn load_transactions_for_block(
        &self,
        block_id: i64,
    ) -> Result<Vec<TransactionRow>, StorageError> {
        Ok(self
            .tables()?
            .transactions
            .iter()
            .filter(|row| row.block_id == block_id)
            .cloned()
            .collect())
    }

    fn load_utxos(&self) -> Result<Vec<Utxo>, StorageError> {
        Ok(self.tables()?.utxos.clone())
    }

    fn append_block(&mut self, block: &Block) -> Result<i64, StorageError> {
        let mut tables = self.tables()?;
        let id = tables.blocks.iter().map(|row| row.id).max().unwrap_or(0) + 1;
        tables.blocks.push(BlockRow::from_block(id, block));
        Ok(id)
    }

    fn append_transaction(&mut self, block_id: i64, tx: &Transaction) -> Result<(), StorageError> {
        let row = TransactionRow::from_transaction(block_id, tx)?;
        self.tables()?.transactions.push(row);
        Ok(())
    }

    fn insert_utxo(&mut self, utxo: &Utxo) -> Result<(), StorageError> {
        self.tables()?.utxos.push(utxo.clone());
        Ok(())
    }

    fn delete_utxo(&mut self, tx_id: &str) -> Result<(), StorageError> {
        self.tables()?.utxos.retain(|utxo| utxo.tx_id != tx_id);
        Ok(())
    }
}
