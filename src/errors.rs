use thiserror::Error;

/// All errors that can occur in the secret lifecycle.
///
/// Messages carry names, paths and context strings only. A secret value
/// must never be formatted into any of these.
#[derive(Debug, Error)]
pub enum SecretsError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Authentication failed: wrong passphrase, tampered or corrupted data")]
    AuthenticationFailure,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("Secret '{0}' already exists (use `update` to change it)")]
    DuplicateName(String),

    #[error("Secret '{0}' not found")]
    NotFound(String),

    #[error("Secret '{0}' was sealed with a custom passphrase; supply it to continue")]
    PassphraseRequired(String),

    #[error("Invalid secret name: {0}")]
    InvalidName(String),

    #[error("Corrupt vault record for '{0}'")]
    CorruptRecord(String),

    #[error("Vault store error: {0}")]
    Store(#[from] rusqlite::Error),

    // --- Redaction / reconciliation errors ---
    #[error("Path {path} no longer resolves for '{name}' (missing segment {depth})")]
    PathResolutionFailure {
        name: String,
        path: String,
        depth: usize,
    },

    #[error("Unsupported {kind} carrier at {path}: {reason}")]
    UnsupportedCarrier {
        kind: &'static str,
        path: String,
        reason: &'static str,
    },

    #[error("Patch incomplete: {0} secret(s) could not be reinserted")]
    IncompletePatch(usize),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

/// Convenience type alias for results in this crate.
pub type Result<T> = std::result::Result<T, SecretsError>;
