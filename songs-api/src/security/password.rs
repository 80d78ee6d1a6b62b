//! Salted password hashing
//!
//! Iterated SHA-256 over `salt || password`, stored as lowercase hex in the
//! `password_hash` / `password_salt` columns.

use rand::RngCore;
use sha2::{Digest, Sha256};
use songs_common::{Error, Result};

const SALT_LEN: usize = 16;
const ITERATIONS: u32 = 10_000;

/// Stored form of a password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
}

/// Hash `password` under a fresh random salt
pub fn hash_password(password: &str) -> PasswordHash {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = to_hex(&salt_bytes);

    PasswordHash {
        hash: hash_with_salt(password, &salt),
        salt,
    }
}

/// Deterministic hash of `password` under `salt`
pub fn hash_with_salt(password: &str, salt: &str) -> String {
    let mut digest = {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        hasher.finalize()
    };

    for _ in 1..ITERATIONS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(salt.as_bytes());
        digest = hasher.finalize();
    }

    format!("{:x}", digest)
}

/// Check `password` against a stored hash and salt
pub fn verify_password(password: &str, stored_hash: &str, salt: &str) -> bool {
    constant_time_eq(hash_with_salt(password, salt).as_bytes(), stored_hash.as_bytes())
}

/// `hash_password` on the blocking pool
pub async fn hash_password_blocking(password: &str) -> Result<PasswordHash> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| Error::Internal(format!("Password hashing task failed: {}", e)))
}

/// `verify_password` on the blocking pool
pub async fn verify_password_blocking(password: &str, stored_hash: &str, salt: &str) -> Result<bool> {
    let (password, stored_hash, salt) = (password.to_owned(), stored_hash.to_owned(), salt.to_owned());
    tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash, &salt))
        .await
        .map_err(|e| Error::Internal(format!("Password verification task failed: {}", e)))
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
