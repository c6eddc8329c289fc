//! SQLite-backed ledger store
//!
//! Three tables: `blocks`, `transactions` (keyed to their block) and
//! `utxos`. Autoincrement IDs give the load order.

use crate::core::{Block, Transaction, Utxo};
use crate::storage::store::{BlockRow, LedgerStore, StorageError, TransactionRow};
use rusqlite::{params, Connection};
use std::fs;
use std::path::PathBuf;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS blocks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        hash TEXT NOT NULL,
        previous_hash TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        nonce INTEGER NOT NULL,
        contribution TEXT
    );
    CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        block_id INTEGER NOT NULL,
        transaction_id TEXT NOT NULL,
        sender TEXT,
        recipient TEXT NOT NULL,
        amount INTEGER NOT NULL,
        inputs TEXT NOT NULL,
        signature TEXT,
        timestamp INTEGER NOT NULL,
        nonce INTEGER NOT NULL,
        FOREIGN KEY(block_id) REFERENCES blocks(id)
    );
    CREATE TABLE IF NOT EXISTS utxos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tx_id TEXT NOT NULL,
        recipient TEXT NOT NULL,
        amount INTEGER NOT NULL
    );
";

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".action_chain"),
            database_file: "blockchain.db".to_string(),
        }
    }
}

impl StorageConfig {
    /// Full path of the database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }
}

/// Ledger store backed by a SQLite database
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database described by `config`
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        let conn = Connection::open(config.database_path())?;
        Self::with_connection(conn)
    }

    /// A throwaway database that lives as long as the store
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Overwrite the stored hash of a block (used to simulate tampering)
    pub fn overwrite_block_hash(&self, block_id: i64, hash: &str) -> Result<(), StorageError> {
        let changed = self.conn.execute(
            "UPDATE blocks SET hash = ?1 WHERE id = ?2",
            params![hash, block_id],
        )?;
        if changed == 0 {
            return Err(StorageError::InvalidData(format!(
                "Block {} not found",
                block_id
            )));
        }
        Ok(())
    }
}

impl LedgerStore for SqliteStore {
    fn load_blocks(&self) -> Result<Vec<BlockRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, hash, previous_hash, timestamp, nonce, contribution
             FROM blocks ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(BlockRow {
                id: row.get(0)?,
                hash: row.get(1)?,
                previous_hash: row.get(2)?,
                timestamp: row.get(3)?,
                nonce: row.get::<_, i64>(4)? as u64,
                contribution: row.get(5)?,
            })
        })?;

        let blocks = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(blocks)
    }

    fn load_transactions_for_block(
        &self,
        block_id: i64,
    ) -> Result<Vec<TransactionRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT block_id, transaction_id, sender, recipient, amount, inputs,
                    signature, timestamp, nonce
             FROM transactions WHERE block_id = ?1 ORDER BY id ASC",
        )?;

        let rows = stmt.query_map(params![block_id], |row| {
            Ok(TransactionRow {
                block_id: row.get(0)?,
                transaction_id: row.get(1)?,
                sender: row.get(2)?,
                recipient: row.get(3)?,
                amount: row.get::<_, i64>(4)? as u64,
                inputs: row.get(5)?,
                signature: row.get(6)?,
                timestamp: row.get(7)?,
                nonce: row.get::<_, i64>(8)? as u64,
            })
        })?;

        let transactions = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    fn load_utxos(&self) -> Result<Vec<Utxo>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT tx_id, recipient, amount FROM utxos ORDER BY id ASC")?;

        let rows = stmt.query_map([], |row| {
            Ok(Utxo {
                tx_id: row.get(0)?,
                owner: row.get(1)?,
                amount: row.get::<_, i64>(2)? as u64,
            })
        })?;

        let utxos = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(utxos)
    }

    fn append_block(&mut self, block: &Block) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO blocks (hash, previous_hash, timestamp, nonce, contribution)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                block.hash,
                block.previous_hash,
                block.timestamp,
                block.nonce as i64,
                block.contribution,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn append_transaction(&mut self, block_id: i64, tx: &Transaction) -> Result<(), StorageError> {
        let row = TransactionRow::from_transaction(block_id, tx)?;
        self.conn.execute(
            "INSERT INTO transactions
                (block_id, transaction_id, sender, recipient, amount, inputs, signature, timestamp, nonce)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                row.block_id,
                row.transaction_id,
                row.sender,
                row.recipient,
                row.amount as i64,
                row.inputs,
                row.signature,
                row.timestamp,
                row.nonce as i64,
            ],
        )?;
        Ok(())
    }

    fn insert_utxo(&mut self, utxo: &Utxo) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO utxos (tx_id, recipient, amount) VALUES (?1, ?2, ?3)",
            params![utxo.tx_id, utxo.owner, utxo.amount as i64],
        )?;
        Ok(())
    }

    fn delete_utxo(&mut self, tx_id: &str) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM utxos WHERE tx_id = ?1", params![tx_id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn temp_config(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            data_dir: dir.path().join("data"),
            ..Default::default()
        }
    }

    #[test]
    fn test_block_and_transactions_persist_across_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = temp_config(&temp_dir);

        let kp = KeyPair::generate();
        let mut transfer = Transaction::transfer(&kp.address(), "bob", 3, vec![]);
        transfer.sign(&kp).unwrap();
        let coinbase = Transaction::coinbase("miner", 1);

        let mut block = Block::new(
            42,
            vec![transfer.clone(), coinbase.clone()],
            "0".to_string(),
            Some("note".to_string()),
        );
        block.seal(1);

        {
            let mut store = SqliteStore::open(&config).unwrap();
            let id = store.append_block(&block).unwrap();
            for tx in &block.transactions {
                store.append_transaction(id, tx).unwrap();
            }
        }

        let store = SqliteStore::open(&config).unwrap();
        let rows = store.load_blocks().unwrap();
        assert_eq!(rows.len(), 1);

        let txs = store
            .load_transactions_for_block(rows[0].id)
            .unwrap()
            .into_iter()
            .map(|row| row.into_transaction().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(txs, vec![transfer, coinbase]);

        let restored = rows[0].clone().into_block(txs);
        assert_eq!(restored, block);
        assert!(restored.verify_hash());
    }

    #[test]
    fn test_utxos_keep_insertion_order() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.insert_utxo(&Utxo::new("b", "alice", 2)).unwrap();
        store.insert_utxo(&Utxo::new("a", "alice", 1)).unwrap();
        store.insert_utxo(&Utxo::new("c", "bob", 3)).unwrap();
        store.delete_utxo("b").unwrap();

        let ids: Vec<String> = store
            .load_utxos()
            .unwrap()
            .into_iter()
            .map(|u| u.tx_id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_overwrite_missing_block() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(matches!(
            store.overwrite_block_hash(9, "x"),
            Err(StorageError::InvalidData(_))
        ));
    }
}
