//! AES-256-GCM authenticated encryption with a detached tag.
//!
//! Each call to `seal` generates a fresh random 12-byte nonce.  The
//! ciphertext, nonce and 16-byte authentication tag are returned as
//! separate values so they can be stored in separate columns.
//!
//! `open` fails closed: if the tag does not verify, the working buffer is
//! wiped and `AuthenticationFailure` is returned.

use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce, Tag};
use zeroize::{Zeroize, Zeroizing};

use super::kdf::SecretKey;
use crate::errors::{Result, SecretsError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Output of `seal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
    pub tag: [u8; TAG_LEN],
}

/// Encrypt `plaintext` under `key` with no associated data.
pub fn seal(plaintext: &[u8], key: &SecretKey) -> Result<Sealed> {
    seal_bound(plaintext, key, b"")
}

/// Encrypt `plaintext` under `key`, authenticating `aad` alongside it.
pub fn seal_bound(plaintext: &[u8], key: &SecretKey, aad: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| SecretsError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut buffer = plaintext.to_vec();
    let tag = match cipher.encrypt_in_place_detached(&nonce, aad, &mut buffer) {
        Ok(tag) => tag,
        Err(e) => {
            buffer.zeroize();
            return Err(SecretsError::EncryptionFailed(format!(
                "encryption error: {e}"
            )));
        }
    };

    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(&nonce);
    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    Ok(Sealed {
        ciphertext: buffer,
        nonce: nonce_bytes,
        tag: tag_bytes,
    })
}

/// Decrypt a value produced by `seal`.
pub fn open(
    ciphertext: &[u8],
    key: &SecretKey,
    nonce: &[u8],
    tag: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    open_bound(ciphertext, key, nonce, tag, b"")
}

/// Decrypt a value produced by `seal_bound` with the same `aad`.
pub fn open_bound(
    ciphertext: &[u8],
    key: &SecretKey,
    nonce: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    // Malformed lengths can never verify; report them as a failed check.
    if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return Err(SecretsError::AuthenticationFailure);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| SecretsError::AuthenticationFailure)?;

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            aad,
            buffer.as_mut_slice(),
            Tag::from_slice(tag),
        )
        .map_err(|_| SecretsError::AuthenticationFailure)?;

    Ok(buffer)
}
