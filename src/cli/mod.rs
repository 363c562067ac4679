//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{Result, SecretsError};
use crate::vault::SecretVault;

/// Environment variable read for a non-interactive passphrase.
pub const PASSPHRASE_ENV: &str = "BPSECRETS_PASSPHRASE";

/// bpsecrets CLI: local secrets for orchestration blueprints.
#[derive(Parser)]
#[command(
    name = "bpsecrets",
    about = "Local encrypted secrets and secret scanning for orchestration blueprints",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault database file (overrides `vault_file` in .bpsecrets.toml)
    #[arg(long, global = true)]
    pub vault_file: Option<String>,

    /// Prompt for a passphrase instead of using the default
    #[arg(long, global = true)]
    pub ask_passphrase: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Store a new secret
    Create {
        /// Secret name (e.g. db_password)
        name: String,
        /// Secret value (omit for interactive prompt)
        value: Option<String>,
    },

    /// Print a secret's value
    Read {
        /// Secret name
        name: String,
    },

    /// Replace an existing secret's value
    Update {
        /// Secret name
        name: String,
        /// New value (omit for interactive prompt)
        value: Option<String>,
    },

    /// Delete a secret
    Delete {
        /// Secret name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// List stored secrets (names and timestamps only)
    List,

    /// Report the secrets a JSON document would have stripped
    Scan {
        /// Path to the JSON document
        file: String,
        /// Document kind: blueprint, runbook, endpoint or provider
        #[arg(short, long, default_value = "blueprint")]
        document: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Open the vault described by the project settings and CLI flags.
pub fn open_vault(cli: &Cli) -> Result<SecretVault> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let path = match &cli.vault_file {
        Some(file) => cwd.join(file),
        None => settings.vault_path(&cwd),
    };
    Ok(SecretVault::new(path, settings.kdf_params()))
}

/// Get the passphrase for a vault operation, trying in order:
/// 1. `BPSECRETS_PASSPHRASE` env var (CI/CD)
/// 2. Interactive prompt, if `--ask-passphrase` was given
///
/// `None` means "use the default passphrase".
pub fn passphrase(cli: &Cli, confirm: bool) -> Result<Option<Zeroizing<String>>> {
    if let Ok(pw) = std::env::var(PASSPHRASE_ENV) {
        if !pw.is_empty() {
            return Ok(Some(Zeroizing::new(pw)));
        }
    }

    if !cli.ask_passphrase {
        return Ok(None);
    }

    let mut prompt = dialoguer::Password::new().with_prompt("Passphrase");
    if confirm {
        prompt = prompt.with_confirmation(
            "Confirm passphrase",
            "Passphrases do not match, try again",
        );
    }
    let pw = prompt
        .interact()
        .map_err(|e| SecretsError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Some(Zeroizing::new(pw)))
}

/// Determine a secret value from one of three sources: the argument,
/// piped stdin, or a hidden interactive prompt.
pub fn secret_value(name: &str, value: Option<&str>) -> Result<Zeroizing<String>> {
    if let Some(v) = value {
        output::warning("Value provided on command line; it may appear in shell history.");
        return Ok(Zeroizing::new(v.to_string()));
    }

    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim_end().len();
        buf.truncate(trimmed);
        return Ok(buf);
    }

    let v = dialoguer::Password::new()
        .with_prompt(format!("Enter value for {name}"))
        .interact()
        .map_err(|e| SecretsError::CommandFailed(format!("input prompt: {e}")))?;
    Ok(Zeroizing::new(v))
}

/// Resolve a user-supplied path against the working directory.
pub fn resolve_path(file: &str) -> Result<PathBuf> {
    Ok(std::env::current_dir()?.join(file))
}
