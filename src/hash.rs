// src/hash.rs

//! SHA-256 helpers for package digests and CRX ids

use sha2::{Digest, Sha256};

/// Length of a SHA-256 hex digest
pub const SHA256_HEX_LEN: usize = 64;

/// Raw SHA-256 digest of a byte slice
pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Hex-encoded SHA-256 digest of a byte slice
pub fn sha256(data: &[u8]) -> String {
    hex::encode(sha256_digest(data))
}
