//! Transaction handling for the ledger
//!
//! A transaction is either a coinbase (reward/issuance, no sender) or a
//! signed transfer from one address to another. Its ID is a SHA-256 digest
//! over the sender, recipient, amount, inputs, timestamp and nonce.

use crate::core::utxo::Utxo;
use crate::core::Amount;
use crate::crypto::{public_key_from_hex, sha256_hex, verify_digest, KeyError, KeyPair};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound (exclusive) of the random per-transaction nonce
pub const TX_NONCE_RANGE: u64 = 1_000_000;

/// Placeholder used in digests for an absent field
const ABSENT: &str = "null";

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Signing key does not belong to the sender")]
    UnauthorizedSigner,
    #[error("No signature in this transaction")]
    MissingSignature,
    #[error("Coinbase transactions cannot be signed")]
    CoinbaseNotSignable,
    #[error("Transaction ID is not a hex digest: {0}")]
    MalformedId(String),
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
}

// =============================================================================
// Transaction
// =============================================================================

/// Who funds a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionKind {
    /// Newly issued coins (genesis allocation or mining reward)
    Coinbase,
    /// Coins moved out of `sender`'s unspent outputs
    Transfer {
        sender: String,
        /// Hex-encoded DER signature over the transaction ID
        signature: Option<String>,
    },
}

/// A ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub kind: TransactionKind,
    pub recipient: String,
    pub amount: Amount,
    /// Unspent outputs of the sender at creation time
    pub inputs: Vec<Utxo>,
    /// Creation time in unix milliseconds
    pub timestamp: i64,
    pub nonce: u64,
    pub id: String,
}

impl Transaction {
    /// Create an unsigned transfer
    pub fn transfer(sender: &str, recipient: &str, amount: Amount, inputs: Vec<Utxo>) -> Self {
        Self::build(
            TransactionKind::Transfer {
                sender: sender.to_string(),
                signature: None,
            },
            recipient,
            amount,
            inputs,
            Utc::now().timestamp_millis(),
        )
    }

    /// Create a coinbase (reward) transaction
    pub fn coinbase(recipient: &str, amount: Amount) -> Self {
        Self::build(
            TransactionKind::Coinbase,
            recipient,
            amount,
            Vec::new(),
            Utc::now().timestamp_millis(),
        )
    }

    /// Create a coinbase with fixed timestamp and nonce, so that its ID is
    /// reproducible (used for the genesis allocation)
    pub fn coinbase_at(recipient: &str, amount: Amount, timestamp: i64) -> Self {
        let mut tx = Self {
            kind: TransactionKind::Coinbase,
            recipient: recipient.to_string(),
            amount,
            inputs: Vec::new(),
            timestamp,
            nonce: 0,
            id: String::new(),
        };
        tx.id = tx.calculate_hash();
        tx
    }

    /// Rebuild a persisted transaction. The stored ID is trusted as-is.
    pub fn from_parts(
        kind: TransactionKind,
        recipient: String,
        amount: Amount,
        inputs: Vec<Utxo>,
        timestamp: i64,
        nonce: u64,
        id: String,
    ) -> Self {
        Self {
            kind,
            recipient,
            amount,
            inputs,
            timestamp,
            nonce,
            id,
        }
    }

    fn build(
        kind: TransactionKind,
        recipient: &str,
        amount: Amount,
        inputs: Vec<Utxo>,
        timestamp: i64,
    ) -> Self {
        let mut tx = Self {
            kind,
            recipient: recipient.to_string(),
            amount,
            inputs,
            timestamp,
            nonce: rand::thread_rng().gen_range(0..TX_NONCE_RANGE),
            id: String::new(),
        };
        tx.id = tx.calculate_hash();
        tx
    }

    /// Whether this is a coinbase transaction
    pub fn is_coinbase(&self) -> bool {
        matches!(self.kind, TransactionKind::Coinbase)
    }

    /// The sending address, absent for coinbase transactions
    pub fn sender(&self) -> Option<&str> {
        match &self.kind {
            TransactionKind::Coinbase => None,
            TransactionKind::Transfer { sender, .. } => Some(sender),
        }
    }

    /// The hex-encoded signature, if any
    pub fn signature(&self) -> Option<&str> {
        match &self.kind {
            TransactionKind::Coinbase => None,
            TransactionKind::Transfer { signature, .. } => signature.as_deref(),
        }
    }

    /// Calculate the transaction digest from its current fields
    pub fn calculate_hash(&self) -> String {
        let inputs = serde_json::to_string(&self.inputs).unwrap_or_default();
        let data = format!(
            "{}{}{}{}{}{}",
            self.sender().unwrap_or(ABSENT),
            self.recipient,
            self.amount,
            inputs,
            self.timestamp,
            self.nonce
        );
        sha256_hex(data.as_bytes())
    }

    /// Sign the transaction ID with the sender's key
    pub fn sign(&mut self, key_pair: &KeyPair) -> Result<(), TransactionError> {
        match &mut self.kind {
            TransactionKind::Coinbase => Err(TransactionError::CoinbaseNotSignable),
            TransactionKind::Transfer { sender, signature } => {
                if key_pair.address() != *sender {
                    return Err(TransactionError::UnauthorizedSigner);
                }
                let digest = hex::decode(&self.id)
                    .map_err(|_| TransactionError::MalformedId(self.id.clone()))?;
                *signature = Some(hex::encode(key_pair.sign(&digest)?));
                Ok(())
            }
        }
    }

    /// Verify the transaction
    ///
    /// Coinbase transactions are always valid. Transfers must carry a
    /// signature that verifies against the sender over a freshly
    /// recomputed digest.
    pub fn is_valid(&self) -> Result<bool, TransactionError> {
        let (sender, signature) = match &self.kind {
            TransactionKind::Coinbase => return Ok(true),
            TransactionKind::Transfer { sender, signature } => (sender, signature),
        };

        let signature = match signature.as_deref() {
            Some(sig) if !sig.is_empty() => sig,
            _ => return Err(TransactionError::MissingSignature),
        };

        let public_key = public_key_from_hex(sender)?;
        let signature = hex::decode(signature).map_err(|_| KeyError::InvalidSignature)?;
        let computed = self.calculate_hash();
        let digest =
            hex::decode(&computed).map_err(|_| TransactionError::MalformedId(computed.clone()))?;

        Ok(verify_digest(&public_key, &digest, &signature)?)
    }
}
