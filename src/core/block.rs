//! Block implementation for the ledger
//!
//! A block binds an ordered batch of transactions to its predecessor's hash
//! and is sealed by searching for a nonce whose hash has enough leading
//! zero hex digits.

use crate::core::transaction::Transaction;
use crate::crypto::{meets_difficulty, sha256_hex};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Previous-hash sentinel carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Number of nonce increments between cancellation checks
pub const CANCEL_CHECK_INTERVAL: u64 = 1024;

/// A block in the chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Creation time in unix milliseconds
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: String,
    /// Free-form annotation supplied by the miner
    pub contribution: Option<String>,
    pub nonce: u64,
    pub hash: String,
}

impl Block {
    /// Create a new (unsealed) block
    pub fn new(
        timestamp: i64,
        transactions: Vec<Transaction>,
        previous_hash: String,
        contribution: Option<String>,
    ) -> Self {
        let mut block = Self {
            timestamp,
            transactions,
            previous_hash,
            contribution,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Calculate the block hash from its current fields
    pub fn calculate_hash(&self) -> String {
        let transactions = serde_json::to_string(&self.transactions).unwrap_or_default();
        let data = format!(
            "{}{}{}{}{}",
            self.previous_hash,
            self.timestamp,
            transactions,
            self.contribution.as_deref().unwrap_or("null"),
            self.nonce
        );
        sha256_hex(data.as_bytes())
    }

    /// Search for a nonce meeting `difficulty`, returning the number of
    /// hashes computed. Runs until it succeeds.
    pub fn seal(&mut self, difficulty: usize) -> u64 {
        let never = AtomicBool::new(false);
        self.seal_cancellable(difficulty, &never).unwrap_or(0)
    }

    /// Like [`Block::seal`], but gives up when `cancel` is set.
    ///
    /// The flag is polled every [`CANCEL_CHECK_INTERVAL`] increments.
    /// Returns `None` when cancelled; the block is then left unsealed.
    pub fn seal_cancellable(&mut self, difficulty: usize, cancel: &AtomicBool) -> Option<u64> {
        let mut attempts = 1u64;

        while !self.meets_difficulty(difficulty) {
            if attempts % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                return None;
            }
            self.nonce += 1;
            self.hash = self.calculate_hash();
            attempts += 1;
        }

        Some(attempts)
    }

    /// Whether the stored hash satisfies `difficulty`
    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }

    /// Whether the stored hash still matches the block's fields
    pub fn verify_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// Every contained transaction verifies
    pub fn all_transactions_valid(&self) -> bool {
        self.transactions
            .iter()
            .all(|tx| matches!(tx.is_valid(), Ok(true)))
    }

    /// The first transaction that fails verification
    pub fn first_invalid_transaction(&self) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|tx| !matches!(tx.is_valid(), Ok(true)))
    }

    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn sample_block() -> Block {
        Block::new(
            1_700_000_000_000,
            vec![Transaction::coinbase_at("miner", 1, 1_700_000_000_000)],
            "abc".to_string(),
            Some("hello".to_string()),
        )
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = sample_block();
        let b = sample_block();
        assert_eq!(a.hash, b.hash);
        assert!(a.verify_hash());
    }

    #[test]
    fn test_hash_covers_every_field() {
        let base = sample_block();

        let mut b = base.clone();
        b.previous_hash = "abd".to_string();
        assert_ne!(b.calculate_hash(), base.hash);

        let mut b = base.clone();
        b.timestamp += 1;
        assert_ne!(b.calculate_hash(), base.hash);

        let mut b = base.clone();
        b.contribution = None;
        assert_ne!(b.calculate_hash(), base.hash);

        let mut b = base.clone();
        b.nonce += 1;
        assert_ne!(b.calculate_hash(), base.hash);

        let mut b = base.clone();
        b.transactions[0].amount = 2;
        assert_ne!(b.calculate_hash(), base.hash);
    }

    #[test]
    fn test_block_sealing() {
        let mut block = sample_block();
        let attempts = block.seal(2);

        assert!(attempts >= 1);
        assert!(block.hash.starts_with("00"));
        assert!(block.meets_difficulty(2));
        assert!(block.verify_hash());
    }

    #[test]
    fn test_seal_is_reproducible() {
        let mut a = sample_block();
        let mut b = sample_block();
        a.seal(2);
        b.seal(2);
        assert_eq!(a.nonce, b.nonce);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_cancelled_seal() {
        let cancel = AtomicBool::new(true);
        let mut block = sample_block();

        // Difficulty far beyond reach; the first poll stops the search
        assert_eq!(block.seal_cancellable(64, &cancel), None);
        assert!(block.nonce < CANCEL_CHECK_INTERVAL);
    }

    #[test]
    fn test_uncancelled_matches_seal() {
        let cancel = AtomicBool::new(false);
        let mut a = sample_block();
        let mut b = sample_block();
        let attempts = a.seal(2);
        assert_eq!(b.seal_cancellable(2, &cancel), Some(attempts));
        assert_eq!(a, b);
    }

    #[test]
    fn test_transaction_validation() {
        let kp = KeyPair::generate();
        let mut signed = Transaction::transfer(&kp.address(), "bob", 5, Vec::new());
        signed.sign(&kp).unwrap();

        let block = Block::new(
            0,
            vec![signed.clone(), Transaction::coinbase("miner", 1)],
            "0".to_string(),
            None,
        );
        assert!(block.all_transactions_valid());
        assert!(block.first_invalid_transaction().is_none());

        let unsigned = Transaction::transfer(&kp.address(), "bob", 5, Vec::new());
        let mut forged = signed;
        forged.amount = 500;

        for bad in [unsigned, forged] {
            let block = Block::new(0, vec![bad.clone()], "0".to_string(), None);
            assert!(!block.all_transactions_valid());
            assert_eq!(block.first_invalid_transaction(), Some(&bad));
        }
    }
}
