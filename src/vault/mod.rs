//! Vault module: local encrypted secret storage.
//!
//! This module provides:
//! - `SecretMetadata`, `SecretMaterial` and `PassphraseSource` (`secret`)
//! - The SQLite-backed `SecretVault` with create/read/update/delete/list (`store`)

pub mod secret;
pub mod store;

// Re-export the most commonly used items.
pub use secret::{PassphraseSource, SecretMaterial, SecretMetadata};
pub use store::{validate_secret_name, SecretVault, DEFAULT_PASSPHRASE};
