//! Wallet implementation for the ledger
//!
//! Provides key management and transaction creation.

use crate::core::{Amount, Blockchain, BlockchainError, Transaction, Utxo};
use crate::crypto::KeyPair;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] crate::crypto::KeyError),
}

/// Serializable wallet data for persistence
#[derive(Debug, Serialize, Deserialize)]
struct WalletData {
    private_key_hex: String,
    address: String,
}

/// A key pair together with the address it controls
pub struct Wallet {
    key_pair: KeyPair,
}

impl Wallet {
    /// Create a new wallet with a fresh key pair
    pub fn new() -> Self {
        Self {
            key_pair: KeyPair::generate(),
        }
    }

    /// Import a wallet from a private key
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, WalletError> {
        let key_pair = KeyPair::from_private_key_hex(private_key_hex)?;
        Ok(Self { key_pair })
    }

    /// The wallet's address (its uncompressed public key in hex)
    pub fn address(&self) -> String {
        self.key_pair.address()
    }

    pub fn public_key(&self) -> String {
        self.key_pair.public_key_hex()
    }

    /// Get the wallet's private key (hex)
    /// WARNING: Keep this secret!
    pub fn private_key(&self) -> String {
        self.key_pair.private_key_hex()
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn balance(&self, blockchain: &Blockchain) -> Amount {
        blockchain.balance_of(&self.address())
    }

    pub fn utxos(&self, blockchain: &Blockchain) -> Vec<Utxo> {
        blockchain.utxos_of(&self.address()).to_vec()
    }

    /// Build and sign a transfer of `amount` to `recipient`.
    ///
    /// The transaction carries every output the wallet currently owns as
    /// its inputs; the ledger spends them greedily on admission.
    pub fn create_transaction(
        &self,
        recipient: &str,
        amount: Amount,
        blockchain: &Blockchain,
    ) -> Result<Transaction, BlockchainError> {
        let utxos = self.utxos(blockchain);
        let balance = blockchain.balance_of(&self.address());

        if balance < amount {
            return Err(BlockchainError::InsufficientFunds {
                address: self.address(),
                have: balance,
                need: amount,
            });
        }

        let mut tx = Transaction::transfer(&self.address(), recipient, amount, utxos);
        tx.sign(&self.key_pair)?;
        Ok(tx)
    }

    /// Save wallet to file
    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        let data = WalletData {
            private_key_hex: self.private_key(),
            address: self.address(),
        };

        let json = serde_json::to_string_pretty(&data)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load wallet from file
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let json = fs::read_to_string(path)?;
        let data: WalletData = serde_json::from_str(&json)?;
        Self::from_private_key(&data.private_key_hex)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}
