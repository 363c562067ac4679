//! SQLite-backed secret vault.
//!
//! `SecretVault` holds only a path and KDF parameters.  Every operation
//! opens its own connection, runs inside one transaction and drops the
//! connection on return, so no decrypted value or open handle outlives
//! the call.  Only `create` brings a missing store file into existence;
//! every other operation treats a missing file as an empty vault.
//!
//! # Schema
//!
//! - `secrets`: identity and timestamps, unique by name.
//! - `secret_material`: 1:1 sealed material: salt, KDF params,
//!   ciphertext, nonce, tag and which passphrase sealed it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{
    params, Connection, ErrorCode, OpenFlags, OptionalExtension, TransactionBehavior,
};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::{derive_key, generate_salt, open_bound, seal_bound, KdfParams};
use crate::errors::{Result, SecretsError};

use super::secret::{PassphraseSource, SecretMaterial, SecretMetadata};

/// Passphrase used when the caller supplies none.
///
/// Publicly known: it keeps values out of plain sight on disk but is not
/// a security boundary.  Supply a passphrase for real protection.
pub const DEFAULT_PASSPHRASE: &str = "bpsecrets::local-default-passphrase";

/// How long a connection waits on another process's lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS secrets (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS secret_material (
        secret_id         TEXT PRIMARY KEY REFERENCES secrets(id) ON DELETE CASCADE,
        kdf_salt          BLOB NOT NULL,
        kdf_log_n         INTEGER NOT NULL,
        kdf_r             INTEGER NOT NULL,
        kdf_p             INTEGER NOT NULL,
        ciphertext        BLOB NOT NULL,
        nonce             BLOB NOT NULL,
        auth_tag          BLOB NOT NULL,
        passphrase_source TEXT NOT NULL
    );
";

/// Handle to a vault file.  Cheap to construct; holds no connection.
#[derive(Debug, Clone)]
pub struct SecretVault {
    path: PathBuf,
    kdf: KdfParams,
}

impl SecretVault {
    /// Point at a vault file.  Nothing is opened until the first operation.
    pub fn new(path: impl Into<PathBuf>, kdf: KdfParams) -> Self {
        Self {
            path: path.into(),
            kdf,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Seal `value` under `name`, creating the store file if needed.
    ///
    /// Uses `DEFAULT_PASSPHRASE` when `passphrase` is `None`.
    pub fn create(
        &self,
        name: &str,
        value: &str,
        passphrase: Option<&str>,
    ) -> Result<SecretMetadata> {
        validate_secret_name(name)?;
        // Derive and seal before taking the write lock.
        let material = self.seal_material(name, value, passphrase)?;

        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if find_id(&tx, name)?.is_some() {
            return Err(SecretsError::DuplicateName(name.to_string()));
        }

        let now = Utc::now();
        let metadata = SecretMetadata {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };

        tx.execute(
            "INSERT INTO secrets (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                metadata.id,
                metadata.name,
                now.to_rfc3339(),
                now.to_rfc3339()
            ],
        )
        .map_err(|e| duplicate_or_store(e, name))?;
        insert_material(&tx, &metadata.id, &material)?;
        tx.commit()?;

        info!(%name, source = material.passphrase_source.as_str(), "secret created");
        Ok(metadata)
    }

    /// Decrypt and return the value stored under `name`.
    ///
    /// `passphrase` may be omitted for secrets sealed with the default.
    pub fn read(&self, name: &str, passphrase: Option<&str>) -> Result<Zeroizing<String>> {
        validate_secret_name(name)?;
        let not_found = || SecretsError::NotFound(name.to_string());

        let conn = self.open_existing()?.ok_or_else(not_found)?;
        let (_, material) = load_material(&conn, name)?.ok_or_else(not_found)?;

        let value = open_material(name, &material, passphrase)?;
        debug!(%name, "secret read");
        Ok(value)
    }

    /// Replace the value stored under `name` with a fresh salt and nonce.
    ///
    /// With `passphrase` omitted the record keeps the passphrase it was
    /// sealed with: the default is reused, a supplied one must be given
    /// again (`PassphraseRequired`) since it is never stored.
    pub fn update(
        &self,
        name: &str,
        value: &str,
        passphrase: Option<&str>,
    ) -> Result<SecretMetadata> {
        validate_secret_name(name)?;
        let not_found = || SecretsError::NotFound(name.to_string());

        let mut conn = self.open_existing()?.ok_or_else(not_found)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let (id, previous) = load_material(&tx, name)?.ok_or_else(not_found)?;

        if passphrase.is_none() && previous.passphrase_source == PassphraseSource::Supplied {
            return Err(SecretsError::PassphraseRequired(name.to_string()));
        }

        let material = self.seal_material(name, value, passphrase)?;
        let now = Utc::now();

        tx.execute(
            "DELETE FROM secret_material WHERE secret_id = ?1",
            params![id],
        )?;
        insert_material(&tx, &id, &material)?;
        tx.execute(
            "UPDATE secrets SET updated_at = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), id],
        )?;

        let metadata = load_metadata(&tx, name)?.ok_or_else(not_found)?;
        tx.commit()?;

        info!(%name, source = material.passphrase_source.as_str(), "secret updated");
        Ok(metadata)
    }

    /// Remove a secret and its material together.
    pub fn delete(&self, name: &str) -> Result<()> {
        validate_secret_name(name)?;
        let not_found = || SecretsError::NotFound(name.to_string());

        let mut conn = self.open_existing()?.ok_or_else(not_found)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let id = find_id(&tx, name)?.ok_or_else(not_found)?;
        tx.execute(
            "DELETE FROM secret_material WHERE secret_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM secrets WHERE id = ?1", params![id])?;
        tx.commit()?;

        info!(%name, "secret deleted");
        Ok(())
    }

    /// Metadata for every secret, sorted by name.  Never decrypts.
    pub fn list(&self) -> Result<Vec<SecretMetadata>> {
        let Some(conn) = self.open_existing()? else {
            return Ok(Vec::new());
        };

        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM secrets ORDER BY name")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, created, updated)| metadata_from_row(id, name, &created, &updated))
            .collect()
    }

    /// Secret names only, sorted.
    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self.list()?.into_iter().map(|m| m.name).collect())
    }

    /// Whether a secret named `name` exists.  No decryption is performed.
    pub fn exists(&self, name: &str) -> Result<bool> {
        validate_secret_name(name)?;
        match self.open_existing()? {
            Some(conn) => Ok(find_id(&conn, name)?.is_some()),
            None => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Open the store, creating the file and its parent directory first
    /// if they are missing.
    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let fresh = !self.path.exists();

        let conn = Connection::open(&self.path)?;
        prepare(&conn)?;

        // Set restrictive permissions on a newly created store (owner-only).
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if fresh {
                let perms = std::fs::Permissions::from_mode(0o600);
                std::fs::set_permissions(&self.path, perms)?;
            }
        }
        #[cfg(not(unix))]
        let _ = fresh;

        Ok(conn)
    }

    /// Open the store only if the file already exists.
    fn open_existing(&self) -> Result<Option<Connection>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "vault file does not exist yet");
            return Ok(None);
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags)?;
        prepare(&conn)?;
        Ok(Some(conn))
    }

    fn seal_material(
        &self,
        name: &str,
        value: &str,
        passphrase: Option<&str>,
    ) -> Result<SecretMaterial> {
        let (passphrase, passphrase_source) = match passphrase {
            Some(p) => (p, PassphraseSource::Supplied),
            None => (DEFAULT_PASSPHRASE, PassphraseSource::Default),
        };

        let salt = generate_salt();
        let key = derive_key(passphrase.as_bytes(), &salt, &self.kdf)?;
        // The name is bound as associated data: material moved to another
        // row fails authentication.
        let sealed = seal_bound(value.as_bytes(), &key, name.as_bytes())?;

        Ok(SecretMaterial {
            kdf_salt: salt.to_vec(),
            kdf: self.kdf,
            ciphertext: sealed.ciphertext,
            nonce: sealed.nonce.to_vec(),
            auth_tag: sealed.tag.to_vec(),
            passphrase_source,
        })
    }
}

/// Busy timeout and schema, for every new connection.
fn prepare(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// A UNIQUE violation on insert means another writer took the name first.
fn duplicate_or_store(err: rusqlite::Error, name: &str) -> SecretsError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            SecretsError::DuplicateName(name.to_string())
        }
        other => SecretsError::Store(other),
    }
}

fn open_material(
    name: &str,
    material: &SecretMaterial,
    passphrase: Option<&str>,
) -> Result<Zeroizing<String>> {
    let passphrase = match (passphrase, material.passphrase_source) {
        (Some(p), _) => p,
        (None, PassphraseSource::Default) => DEFAULT_PASSPHRASE,
        (None, PassphraseSource::Supplied) => {
            return Err(SecretsError::PassphraseRequired(name.to_string()));
        }
    };

    let key = derive_key(passphrase.as_bytes(), &material.kdf_salt, &material.kdf)?;
    let plaintext = open_bound(
        &material.ciphertext,
        &key,
        &material.nonce,
        &material.auth_tag,
        name.as_bytes(),
    )?;

    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| SecretsError::CorruptRecord(name.to_string()))?;
    Ok(Zeroizing::new(text.to_string()))
}

fn find_id(conn: &Connection, name: &str) -> Result<Option<String>> {
    let id = conn
        .query_row(
            "SELECT id FROM secrets WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn load_metadata(conn: &Connection, name: &str) -> Result<Option<SecretMetadata>> {
    let row = conn
        .query_row(
            "SELECT id, name, created_at, updated_at FROM secrets WHERE name = ?1",
            params![name],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, name, created, updated)| metadata_from_row(id, name, &created, &updated))
        .transpose()
}

/// Raw material columns, before they are checked and parsed.
struct MaterialRow {
    id: String,
    kdf_salt: Vec<u8>,
    log_n: i64,
    r: i64,
    p: i64,
    ciphertext: Vec<u8>,
    nonce: Vec<u8>,
    auth_tag: Vec<u8>,
    source: String,
}

fn load_material(conn: &Connection, name: &str) -> Result<Option<(String, SecretMaterial)>> {
    let row = conn
        .query_row(
            "SELECT s.id, m.kdf_salt, m.kdf_log_n, m.kdf_r, m.kdf_p,
                    m.ciphertext, m.nonce, m.auth_tag, m.passphrase_source
             FROM secrets s
             JOIN secret_material m ON m.secret_id = s.id
             WHERE s.name = ?1",
            params![name],
            |row| {
                Ok(MaterialRow {
                    id: row.get(0)?,
                    kdf_salt: row.get(1)?,
                    log_n: row.get(2)?,
                    r: row.get(3)?,
                    p: row.get(4)?,
                    ciphertext: row.get(5)?,
                    nonce: row.get(6)?,
                    auth_tag: row.get(7)?,
                    source: row.get(8)?,
                })
            },
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };
    let corrupt = || SecretsError::CorruptRecord(name.to_string());

    let passphrase_source = PassphraseSource::parse(&row.source).ok_or_else(corrupt)?;
    let kdf = KdfParams {
        log_n: u8::try_from(row.log_n).map_err(|_| corrupt())?,
        r: u32::try_from(row.r).map_err(|_| corrupt())?,
        p: u32::try_from(row.p).map_err(|_| corrupt())?,
    };
    // Stored cost parameters are untrusted: out-of-range values must never
    // reach the KDF.
    if let Err(e) = kdf.validate() {
        warn!(%name, error = %e, "stored KDF parameters rejected");
        return Err(corrupt());
    }

    let material = SecretMaterial {
        kdf_salt: row.kdf_salt,
        kdf,
        ciphertext: row.ciphertext,
        nonce: row.nonce,
        auth_tag: row.auth_tag,
        passphrase_source,
    };
    Ok(Some((row.id, material)))
}

fn insert_material(conn: &Connection, secret_id: &str, material: &SecretMaterial) -> Result<()> {
    conn.execute(
        "INSERT INTO secret_material
             (secret_id, kdf_salt, kdf_log_n, kdf_r, kdf_p,
              ciphertext, nonce, auth_tag, passphrase_source)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            secret_id,
            material.kdf_salt,
            material.kdf.log_n,
            material.kdf.r,
            material.kdf.p,
            material.ciphertext,
            material.nonce,
            material.auth_tag,
            material.passphrase_source.as_str(),
        ],
    )?;
    Ok(())
}

fn metadata_from_row(
    id: String,
    name: String,
    created: &str,
    updated: &str,
) -> Result<SecretMetadata> {
    let parse = |ts: &str| {
        DateTime::parse_from_rfc3339(ts)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| SecretsError::CorruptRecord(name.clone()))
    };
    let created_at = parse(created)?;
    let updated_at = parse(updated)?;
    Ok(SecretMetadata {
        id,
        name,
        created_at,
        updated_at,
    })
}

/// Validate that a secret name is safe.
///
/// Allowed: ASCII letters, digits, underscores, hyphens, periods.
/// Must be non-empty and at most 256 characters.
pub fn validate_secret_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SecretsError::InvalidName(
            "secret name cannot be empty".into(),
        ));
    }
    if name.len() > 256 {
        return Err(SecretsError::InvalidName(
            "secret name cannot exceed 256 characters".into(),
        ));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(SecretsError::InvalidName(format!(
            "'{name}' contains invalid characters; only ASCII letters, digits, underscores, hyphens, and periods are allowed"
        )));
    }
    Ok(())
}
