//! Cryptographic primitives.
//!
//! This module provides:
//! - scrypt password-based key derivation (`kdf`)
//! - AES-256-GCM sealing and opening with a detached tag (`encryption`)

pub mod encryption;
pub mod kdf;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{derive_key, seal, open, ...};
pub use encryption::{open, open_bound, seal, seal_bound, Sealed, NONCE_LEN, TAG_LEN};
pub use kdf::{derive_key, generate_salt, KdfParams, SecretKey, KEY_LEN, SALT_LEN};
