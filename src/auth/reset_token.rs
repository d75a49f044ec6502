//! Raw reset tokens are 32 random bytes, hex encoded. Only the SHA-256 hash
//! and a short lookup prefix are ever stored.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

pub const TOKEN_BYTES: usize = 32;
pub const LOOKUP_PREFIX_LEN: usize = 16;

pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// `None` for input too short to have come from [`generate`].
pub fn lookup_prefix(raw: &str) -> Option<&str> {
    raw.get(..LOOKUP_PREFIX_LEN)
}

/// Constant-time comparison of two hex digests.
pub fn hashes_match(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
