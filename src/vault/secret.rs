//! Secret identity and sealed material as persisted in the vault.
//!
//! Every secret is two related records: the identity row (`SecretMetadata`)
//! and its 1:1 sealed material (`SecretMaterial`).  Plaintext values are
//! never part of either.

use chrono::{DateTime, Utc};

use crate::crypto::KdfParams;

/// Which passphrase a record was sealed with.
///
/// The passphrase itself is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassphraseSource {
    /// The well-known default passphrase.
    Default,
    /// A passphrase supplied by the caller at seal time.
    Supplied,
}

impl PassphraseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Supplied => "supplied",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "supplied" => Some(Self::Supplied),
            _ => None,
        }
    }
}

/// Identity and timestamps of a stored secret (no sealed material).
///
/// Returned by `SecretVault::list` so callers can display secrets
/// without touching any ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMetadata {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The sealed form of one secret value.
#[derive(Debug, Clone)]
pub struct SecretMaterial {
    pub kdf_salt: Vec<u8>,
    pub kdf: KdfParams,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
    pub auth_tag: Vec<u8>,
    pub passphrase_source: PassphraseSource,
}
