//! ECDSA key management for the ledger
//!
//! Provides key pair generation, signing, and verification using
//! the secp256k1 elliptic curve. An address is the hex encoding of the
//! uncompressed public key.

use rand::rngs::OsRng;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature encoding")]
    InvalidSignature,
    #[error("Digest must be 32 bytes, got {0}")]
    InvalidDigest(usize),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (uncompressed, `04` prefix)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize_uncompressed())
    }

    /// The ledger address owned by this key pair
    pub fn address(&self) -> String {
        self.public_key_hex()
    }

    /// Sign a 32-byte digest, returning a DER-encoded signature
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_digest(&self.secret_key, digest)
    }

    /// Verify a DER signature against this key pair's public key
    pub fn verify(&self, digest: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        verify_digest(&self.public_key, digest, signature)
    }
}

/// Parse a public key from hex string (compressed or uncompressed)
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

fn digest_message(digest: &[u8]) -> Result<Message, KeyError> {
    Message::from_digest_slice(digest).map_err(|_| KeyError::InvalidDigest(digest.len()))
}

/// Sign a digest with a secret key (RFC 6979 deterministic nonce)
pub fn sign_digest(secret_key: &SecretKey, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();
    let message = digest_message(digest)?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_der().to_vec())
}

/// Verify a DER-encoded signature against a public key
pub fn verify_digest(
    public_key: &PublicKey,
    digest: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();
    let message = digest_message(digest)?;
    let sig = Signature::from_der(signature).map_err(|_| KeyError::InvalidSignature)?;

    Ok(secp.verify_ecdsa(&message, &sig, public_key).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::sha256;

    #[test]
    fn test_key_pair_generation() {
        let kp = KeyPair::generate();
        assert_eq!(kp.private_key_hex().len(), 64);
        // 65-byte uncompressed key
        assert_eq!(kp.public_key_hex().len(), 130);
        assert!(kp.address().starts_with("04"));
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let digest = sha256(b"Hello, ledger!");

        let signature = kp.sign(&digest).unwrap();
        assert!(kp.verify(&digest, &signature).unwrap());

        let other = sha256(b"Hello, other ledger!");
        assert!(!kp.verify(&other, &signature).unwrap());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let kp = KeyPair::generate();
        let digest = sha256(b"same message");
        assert_eq!(kp.sign(&digest).unwrap(), kp.sign(&digest).unwrap());
    }

    #[test]
    fn test_key_pair_from_hex() {
        let kp1 = KeyPair::generate();
        let private_hex = kp1.private_key_hex();

        let kp2 = KeyPair::from_private_key_hex(&private_hex).unwrap();
        assert_eq!(kp1.public_key_hex(), kp2.public_key_hex());
        assert_eq!(kp1.address(), kp2.address());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            KeyPair::from_private_key_hex("not-hex"),
            Err(KeyError::InvalidPrivateKey)
        ));
        assert!(matches!(
            public_key_from_hex("04abcd"),
            Err(KeyError::InvalidPublicKey)
        ));

        let kp = KeyPair::generate();
        let digest = sha256(b"x");
        assert!(matches!(
            kp.verify(&digest, &[1, 2, 3]),
            Err(KeyError::InvalidSignature)
        ));
        assert!(matches!(kp.sign(b"short"), Err(KeyError::InvalidDigest(5))));
    }

    #[test]
    fn test_parses_uncompressed_key() {
        let kp = KeyPair::generate();
        let parsed = public_key_from_hex(&kp.public_key_hex()).unwrap();
        assert_eq!(parsed, kp.public_key);
    }
}
