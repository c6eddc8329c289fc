//! Cryptographic hashing utilities for the ledger
//!
//! Provides the SHA-256 helpers used for block hashes and transaction IDs,
//! and the hex-prefix check used by proof-of-work.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a lowercase hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Checks if a hex digest meets the difficulty target
///
/// The first `difficulty` hex characters must all be `'0'`.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}
