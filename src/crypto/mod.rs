//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing
//! - Proof-of-work difficulty checks on hex digests
//! - ECDSA key management (secp256k1)

pub mod hash;
pub mod keys;

pub use hash::{meets_difficulty, sha256, sha256_hex};
pub use keys::{public_key_from_hex, sign_digest, verify_digest, KeyError, KeyPair};
