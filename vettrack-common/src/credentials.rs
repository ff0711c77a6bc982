//! Password hashing and session tokens
//!
//! # Password storage
//!
//! 1. Generate a random 16-byte salt
//! 2. Hash `salt || password` with SHA-256
//! 3. Re-hash `digest || salt` for the remaining rounds
//! 4. Store digest and salt as lowercase hex
//!
//! Pure functions only; database access lives in the service crate.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of SHA-256 rounds applied to each password
pub const HASH_ROUNDS: u32 = 10_000;

const SALT_BYTES: usize = 16;
const TOKEN_BYTES: usize = 32;

/// Salted password digest as stored in the `users` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> PasswordHash {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = to_hex(&salt);
    let hash = digest_with_salt(password, &salt);
    PasswordHash { hash, salt }
}

/// Check a password against a stored digest and salt
///
/// # Examples
///
/// ```
/// use vettrack_common::credentials::{hash_password, verify_password};
///
/// let stored = hash_password("hunter2");
/// assert!(verify_password("hunter2", &stored.hash, &stored.salt));
/// assert!(!verify_password("hunter3", &stored.hash, &stored.salt));
/// ```
pub fn verify_password(password: &str, hash: &str, salt: &str) -> bool {
    let calculated = digest_with_salt(password, salt);
    constant_time_eq(calculated.as_bytes(), hash.as_bytes())
}

/// Generate an opaque session token (64 hex chars)
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}

/// SHA-256 of arbitrary bytes as 64 hex characters
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn digest_with_salt(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();

    for _ in 1..HASH_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(salt.as_bytes());
        digest = hasher.finalize();
    }

    format!("{:x}", digest)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
