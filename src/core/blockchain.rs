//! Blockchain orchestrator
//!
//! Owns the chain, the UTXO ledger and the pending-transaction queue, and
//! hands every change to a [`LedgerStore`]. Persistence is best effort:
//! write failures are logged and never roll back the in-memory state, so
//! the durable copy may lag behind after a crash.

use crate::config::ChainConfig;
use crate::core::block::{Block, GENESIS_PREVIOUS_HASH};
use crate::core::transaction::{Transaction, TransactionError};
use crate::core::utxo::{LedgerError, SpendOutcome, Utxo, UtxoLedger};
use crate::core::Amount;
use crate::storage::{LedgerStore, StorageError};
use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use thiserror::Error;

/// Lifecycle of the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChainState {
    Uninitialized,
    Loading,
    Ready,
    /// Persisted data could not be loaded or failed integrity checks
    CorruptedOnLoad,
}

/// Which integrity rule a block violates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    GenesisPreviousHash { found: String },
    BrokenLink { expected: String, found: String },
    HashMismatch { stored: String, computed: String },
}

impl fmt::Display for Corruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Corruption::GenesisPreviousHash { found } => write!(
                f,
                "genesis previous hash should be \"{}\" but found {}",
                GENESIS_PREVIOUS_HASH, found
            ),
            Corruption::BrokenLink { expected, found } => write!(
                f,
                "previous hash {} does not match predecessor hash {}",
                found, expected
            ),
            Corruption::HashMismatch { stored, computed } => write!(
                f,
                "stored hash {} does not match recomputed hash {}",
                stored, computed
            ),
        }
    }
}

/// Blockchain-related errors
#[derive(Error, Debug)]
pub enum BlockchainError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Insufficient funds for {address}: have {have}, need {need}")]
    InsufficientFunds {
        address: String,
        have: Amount,
        need: Amount,
    },
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error("Chain corruption at block {index}: {reason}")]
    ChainCorruption { index: usize, reason: Corruption },
    #[error("Initialization failed: {0}")]
    InitializationFailure(String),
    #[error("Blockchain is not ready (state: {0:?})")]
    NotReady(ChainState),
}

impl From<LedgerError> for BlockchainError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                address,
                have,
                need,
            } => BlockchainError::InsufficientFunds {
                address,
                have,
                need,
            },
            LedgerError::CoinbaseSpend => BlockchainError::InvalidTransaction(
                "coinbase transactions do not spend outputs".to_string(),
            ),
            LedgerError::SupplyOverflow { supply, amount } => {
                BlockchainError::InvalidTransaction(format!(
                    "crediting {} would overflow the total supply of {}",
                    amount, supply
                ))
            }
        }
    }
}

impl From<StorageError> for BlockchainError {
    fn from(err: StorageError) -> Self {
        BlockchainError::InitializationFailure(err.to_string())
    }
}

/// Chain statistics
#[derive(Debug, Clone, Serialize)]
pub struct ChainStats {
    pub height: u64,
    pub total_blocks: u64,
    pub total_transactions: u64,
    pub total_supply: Amount,
    pub pending_transactions: usize,
    pub difficulty: usize,
    pub latest_hash: String,
}

/// The ledger engine
pub struct Blockchain {
    blocks: Vec<Block>,
    ledger: UtxoLedger,
    pending: Vec<Transaction>,
    config: ChainConfig,
    state: ChainState,
    store: Box<dyn LedgerStore>,
}

impl Blockchain {
    /// Create an uninitialized engine; call [`Blockchain::initialize`] next
    pub fn new(store: Box<dyn LedgerStore>, config: ChainConfig) -> Self {
        Self {
            blocks: Vec::new(),
            ledger: UtxoLedger::new(),
            pending: Vec::new(),
            config,
            state: ChainState::Uninitialized,
            store,
        }
    }

    /// Create and initialize in one step
    pub fn open(store: Box<dyn LedgerStore>, config: ChainConfig) -> Result<Self, BlockchainError> {
        let mut blockchain = Self::new(store, config);
        blockchain.initialize()?;
        Ok(blockchain)
    }

    /// Load the persisted chain, or create and persist the genesis block
    /// when the store is empty. A loaded chain must pass
    /// [`Blockchain::validate_chain_integrity`] before the engine is ready.
    pub fn initialize(&mut self) -> Result<(), BlockchainError> {
        if self.state != ChainState::Uninitialized {
            return Err(BlockchainError::InitializationFailure(format!(
                "cannot initialize from state {:?}",
                self.state
            )));
        }

        self.state = ChainState::Loading;

        match self.load_or_create() {
            Ok(()) => {
                self.state = ChainState::Ready;
                info!(
                    "Blockchain ready: {} blocks, {} holders",
                    self.blocks.len(),
                    self.ledger.holder_count()
                );
                Ok(())
            }
            Err(e) => {
                self.state = ChainState::CorruptedOnLoad;
                error!("Failed to initialize blockchain: {}", e);
                Err(e)
            }
        }
    }

    fn load_or_create(&mut self) -> Result<(), BlockchainError> {
        let rows = self.store.load_blocks()?;

        if rows.is_empty() {
            return self.create_genesis_block();
        }

        let mut blocks = Vec::with_capacity(rows.len());
        for row in rows {
            let transactions = self
                .store
                .load_transactions_for_block(row.id)?
                .into_iter()
                .map(|tx| tx.into_transaction())
                .collect::<Result<Vec<_>, _>>()?;

            let block = row.into_block(transactions);
            debug!(
                "Loaded block {} with previous hash {}",
                block.hash, block.previous_hash
            );
            blocks.push(block);
        }

        self.blocks = blocks;
        self.ledger = UtxoLedger::from_entries(self.store.load_utxos()?);

        info!("All blocks loaded. Validating chain...");
        self.validate_chain_integrity()
    }

    fn create_genesis_block(&mut self) -> Result<(), BlockchainError> {
        let genesis = self.config.genesis.clone();
        let allocation = Transaction::coinbase_at(&genesis.recipient, genesis.amount, genesis.timestamp);

        let mut block = Block::new(
            genesis.timestamp,
            vec![allocation.clone()],
            GENESIS_PREVIOUS_HASH.to_string(),
            Some(genesis.contribution),
        );
        block.seal(self.config.difficulty);
        info!("Genesis block mined: {}", block.hash);

        let utxo =
            self.ledger
                .credit_unconditional(&genesis.recipient, &allocation.id, genesis.amount)?;
        self.blocks.push(block.clone());

        self.persist_block(&block);
        self.persist_utxo(&utxo);
        Ok(())
    }

    fn ensure_ready(&self) -> Result<(), BlockchainError> {
        match self.state {
            ChainState::Ready => Ok(()),
            state => Err(BlockchainError::NotReady(state)),
        }
    }

    /// Admit a signed transfer.
    ///
    /// The spend is applied to the ledger immediately and the transaction
    /// is queued for the next mined block; mining does not touch the
    /// ledger for queued transfers again.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<(), BlockchainError> {
        self.ensure_ready()?;

        let sender = tx
            .sender()
            .ok_or_else(|| {
                BlockchainError::InvalidTransaction(
                    "coinbase transactions cannot be submitted".to_string(),
                )
            })?
            .to_string();

        match tx.is_valid() {
            Ok(true) => {}
            Ok(false) => {
                warn!("Rejected transaction {}: bad signature", tx.id);
                return Err(BlockchainError::InvalidTransaction(format!(
                    "signature verification failed for {}",
                    tx.id
                )));
            }
            Err(e) => {
                warn!("Rejected transaction {}: {}", tx.id, e);
                return Err(BlockchainError::InvalidTransaction(e.to_string()));
            }
        }

        // The stored ID is only trusted on reload; a submitted one must
        // match the content it claims to identify
        let computed = tx.calculate_hash();
        if tx.id != computed {
            warn!("Rejected transaction {}: ID does not match content", tx.id);
            return Err(BlockchainError::InvalidTransaction(format!(
                "transaction ID {} does not match its content hash {}",
                tx.id, computed
            )));
        }

        if self.contains_transaction(&tx.id) {
            warn!("Rejected transaction {}: already submitted", tx.id);
            return Err(BlockchainError::InvalidTransaction(format!(
                "transaction {} was already submitted",
                tx.id
            )));
        }

        let have = self.ledger.balance(&sender);
        if have < tx.amount {
            warn!(
                "Rejected transaction {}: {} holds {}, needs {}",
                tx.id, sender, have, tx.amount
            );
            return Err(BlockchainError::InsufficientFunds {
                address: sender,
                have,
                need: tx.amount,
            });
        }

        let outcome = self.ledger.apply_spend(&tx)?;
        self.persist_spend(&outcome);

        info!(
            "Transaction added from {} to {} of {} tokens",
            sender, tx.recipient, tx.amount
        );
        self.pending.push(tx);
        Ok(())
    }

    /// Seal the pending transactions plus a coinbase reward into a new block
    pub fn mine(
        &mut self,
        miner_address: &str,
        contribution: Option<String>,
        reward: Amount,
    ) -> Result<Block, BlockchainError> {
        let never = AtomicBool::new(false);
        self.mine_cancellable(miner_address, contribution, reward, &never)?
            .ok_or_else(|| BlockchainError::InvalidBlock("sealing was cancelled".to_string()))
    }

    /// Like [`Blockchain::mine`], but returns `Ok(None)` if `cancel` is set
    /// before a nonce is found. The chain, ledger and queue are untouched
    /// in that case.
    pub fn mine_cancellable(
        &mut self,
        miner_address: &str,
        contribution: Option<String>,
        reward: Amount,
        cancel: &AtomicBool,
    ) -> Result<Option<Block>, BlockchainError> {
        self.ensure_ready()?;
        self.ledger.can_credit(reward)?;

        let previous_hash = self
            .latest_block()
            .map(|b| b.hash.clone())
            .ok_or(BlockchainError::NotReady(self.state))?;
        let index = self.blocks.len();
        let start = Instant::now();

        let coinbase = Transaction::coinbase(miner_address, reward);
        let mut transactions = self.pending.clone();
        transactions.push(coinbase.clone());

        let mut block = Block::new(
            Utc::now().timestamp_millis(),
            transactions,
            previous_hash,
            contribution,
        );

        info!(
            "Mining block {} with difficulty {}...",
            index, self.config.difficulty
        );

        let attempts = match block.seal_cancellable(self.config.difficulty, cancel) {
            Some(attempts) => attempts,
            None => {
                warn!("Mining of block {} cancelled", index);
                return Ok(None);
            }
        };

        if let Some(bad) = block.first_invalid_transaction() {
            return Err(BlockchainError::InvalidBlock(format!(
                "transaction {} failed verification",
                bad.id
            )));
        }

        let elapsed = start.elapsed().as_millis();
        info!(
            "Block {} mined in {}ms ({} attempts): {}",
            index, elapsed, attempts, block.hash
        );

        let reward_utxo = self
            .ledger
            .credit_unconditional(miner_address, &coinbase.id, reward)?;
        self.blocks.push(block.clone());
        self.pending.clear();

        self.persist_block(&block);
        self.persist_utxo(&reward_utxo);

        Ok(Some(block))
    }

    /// Check genesis, linkage and stored hashes; stops at the first violation
    pub fn validate_chain_integrity(&self) -> Result<(), BlockchainError> {
        for (index, block) in self.blocks.iter().enumerate() {
            debug!("Validating block {}", index);

            if index == 0 {
                if block.previous_hash != GENESIS_PREVIOUS_HASH {
                    return Err(BlockchainError::ChainCorruption {
                        index,
                        reason: Corruption::GenesisPreviousHash {
                            found: block.previous_hash.clone(),
                        },
                    });
                }
            } else {
                let previous = &self.blocks[index - 1];
                if block.previous_hash != previous.hash {
                    return Err(BlockchainError::ChainCorruption {
                        index,
                        reason: Corruption::BrokenLink {
                            expected: previous.hash.clone(),
                            found: block.previous_hash.clone(),
                        },
                    });
                }
            }

            let computed = block.calculate_hash();
            if block.hash != computed {
                return Err(BlockchainError::ChainCorruption {
                    index,
                    reason: Corruption::HashMismatch {
                        stored: block.hash.clone(),
                        computed,
                    },
                });
            }
        }

        debug!("Blockchain is valid.");
        Ok(())
    }

    /// Whether a transaction with this ID is queued or already in a block
    pub fn contains_transaction(&self, id: &str) -> bool {
        self.pending.iter().any(|tx| tx.id == id)
            || self
                .blocks
                .iter()
                .flat_map(|b| &b.transactions)
                .any(|tx| tx.id == id)
    }

    pub fn balance_of(&self, address: &str) -> Amount {
        self.ledger.balance(address)
    }

    pub fn utxos_of(&self, address: &str) -> &[Utxo] {
        self.ledger.utxos_of(address)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Index of the latest block (0 for a chain holding only genesis)
    pub fn height(&self) -> u64 {
        self.blocks.len().saturating_sub(1) as u64
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn ledger(&self) -> &UtxoLedger {
        &self.ledger
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn difficulty(&self) -> usize {
        self.config.difficulty
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn stats(&self) -> ChainStats {
        ChainStats {
            height: self.height(),
            total_blocks: self.blocks.len() as u64,
            total_transactions: self.blocks.iter().map(|b| b.tx_count() as u64).sum(),
            total_supply: self.ledger.total_supply(),
            pending_transactions: self.pending.len(),
            difficulty: self.config.difficulty,
            latest_hash: self
                .latest_block()
                .map(|b| b.hash.clone())
                .unwrap_or_default(),
        }
    }

    // =========================================================================
    // Persistence (best effort)
    // =========================================================================

    fn persist_block(&mut self, block: &Block) {
        let block_id = match self.store.append_block(block) {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to persist block {}: {}", block.hash, e);
                return;
            }
        };

        for tx in &block.transactions {
            if let Err(e) = self.store.append_transaction(block_id, tx) {
                error!("Failed to persist transaction {}: {}", tx.id, e);
            }
        }
    }

    fn persist_utxo(&mut self, utxo: &Utxo) {
        if let Err(e) = self.store.insert_utxo(utxo) {
            error!("Failed to persist UTXO {}: {}", utxo.tx_id, e);
        }
    }

    fn persist_spend(&mut self, outcome: &SpendOutcome) {
        for spent in &outcome.spent {
            if let Err(e) = self.store.delete_utxo(&spent.tx_id) {
                error!("Failed to delete UTXO {}: {}", spent.tx_id, e);
            }
        }
        for created in &outcome.created {
            self.persist_utxo(created);
        }
    }
}

impl fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blockchain")
            .field("state", &self.state)
            .field("blocks", &self.blocks.len())
            .field("pending", &self.pending.len())
            .field("difficulty", &self.config.difficulty)
            .finish()
    }
}
