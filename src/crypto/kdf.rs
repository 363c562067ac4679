//! Password-based key derivation using scrypt.
//!
//! scrypt is a memory-hard KDF.  Parameters are configurable via
//! `KdfParams` (loaded from `.bpsecrets.toml` or sensible defaults) and
//! are stored next to every sealed record so a later read uses exactly
//! the parameters the record was sealed with.

use rand::RngCore;
use zeroize::Zeroize;

use crate::errors::{Result, SecretsError};

/// Length of the per-secret salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Minimum accepted `log_n` (N = 1024).
const MIN_LOG_N: u8 = 10;

/// Maximum accepted `log_n` (N = 2^20).
const MAX_LOG_N: u8 = 20;

/// Maximum accepted block size.
const MAX_R: u32 = 32;

/// Maximum accepted parallelization.
const MAX_P: u32 = 16;

/// Upper bound on the scrypt working set (128 * r * N bytes): 1 GiB.
const MAX_MEMORY: u64 = 1 << 30;

/// Configurable scrypt cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// CPU/memory cost as a power of two (N = 2^log_n).
    pub log_n: u8,
    /// Block size.
    pub r: u32,
    /// Parallelization.
    pub p: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            log_n: 14,
            r: 8,
            p: 1,
        }
    }
}

impl KdfParams {
    /// Reject parameters that would make the derived key trivially cheap,
    /// or so expensive that deriving it would exhaust memory.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_LOG_N..=MAX_LOG_N).contains(&self.log_n) {
            return Err(SecretsError::KeyDerivationFailed(format!(
                "scrypt log_n must be between {MIN_LOG_N} and {MAX_LOG_N} (got {})",
                self.log_n
            )));
        }
        if !(1..=MAX_R).contains(&self.r) {
            return Err(SecretsError::KeyDerivationFailed(format!(
                "scrypt block size r must be between 1 and {MAX_R} (got {})",
                self.r
            )));
        }
        if !(1..=MAX_P).contains(&self.p) {
            return Err(SecretsError::KeyDerivationFailed(format!(
                "scrypt parallelization p must be between 1 and {MAX_P} (got {})",
                self.p
            )));
        }
        if self.memory_cost() > MAX_MEMORY {
            return Err(SecretsError::KeyDerivationFailed(format!(
                "scrypt parameters need {} MiB, limit is {} MiB",
                self.memory_cost() >> 20,
                MAX_MEMORY >> 20
            )));
        }
        Ok(())
    }

    /// Bytes scrypt allocates for these parameters.
    fn memory_cost(&self) -> u64 {
        128 * u64::from(self.r) * (1u64 << self.log_n)
    }
}

/// A 256-bit symmetric key that zeroes its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct SecretKey {
    bytes: [u8; KEY_LEN],
}

impl SecretKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

/// Derive a 32-byte key from a passphrase and salt using scrypt.
///
/// The same passphrase + salt + params always produce the same key.
pub fn derive_key(password: &[u8], salt: &[u8], params: &KdfParams) -> Result<SecretKey> {
    params.validate()?;

    let scrypt_params = scrypt::Params::new(params.log_n, params.r, params.p, KEY_LEN)
        .map_err(|e| SecretsError::KeyDerivationFailed(format!("invalid scrypt params: {e}")))?;

    let mut out = [0u8; KEY_LEN];
    scrypt::scrypt(password, salt, &scrypt_params, &mut out)
        .map_err(|e| SecretsError::KeyDerivationFailed(format!("scrypt failed: {e}")))?;

    let key = SecretKey::new(out);
    out.zeroize();
    Ok(key)
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
