//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The iteration count is deliberately high so that offline guessing
//! stays expensive while an interactive unlock still feels instant.
//! Callers on an async runtime should run derivation on the blocking pool.

use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::errors::{VaultError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Minimum accepted iteration count.
pub const MIN_ITERATIONS: u32 = 10_000;

/// Maximum accepted iteration count.
pub const MAX_ITERATIONS: u32 = 10 * DEFAULT_ITERATIONS;

/// Configurable PBKDF2 parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pbkdf2Params {
    /// Number of HMAC-SHA256 rounds (default: 100 000).
    pub iterations: u32,
}

impl Pbkdf2Params {
    /// Returns `true` if the iteration count is within the accepted bounds.
    pub fn is_in_range(&self) -> bool {
        (MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.iterations)
    }
}

impl Default for Pbkdf2Params {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Derive a 32-byte key from a password and salt with the default
/// iteration count.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
    derive_key_with_params(password, salt, &Pbkdf2Params::default())
}

/// Derive a 32-byte key with an explicit iteration count.
///
/// The same password + salt + params will always produce the same key.
/// Empty inputs and iteration counts outside
/// `MIN_ITERATIONS..=MAX_ITERATIONS` are rejected.
pub fn derive_key_with_params(
    password: &[u8],
    salt: &[u8],
    params: &Pbkdf2Params,
) -> Result<[u8; KEY_LEN]> {
    if password.is_empty() {
        return Err(VaultError::KeyDerivationFailed(
            "password must not be empty".into(),
        ));
    }
    if salt.is_empty() {
        return Err(VaultError::KeyDerivationFailed(
            "salt must not be empty".into(),
        ));
    }
    if !params.is_in_range() {
        return Err(VaultError::KeyDerivationFailed(format!(
            "PBKDF2 iterations must be within {MIN_ITERATIONS}..={MAX_ITERATIONS} (got {})",
            params.iterations
        )));
    }

    pbkdf2_sha256(password, salt, params.iterations)
}

fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; KEY_LEN]> {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, iterations, &mut key)
        .map_err(|e| VaultError::KeyDerivationFailed(format!("PBKDF2 failed: {e}")))?;
    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
