//! `bpsecrets create`: seal a new secret into the vault.

use tracing::info;

use crate::cli::output;
use crate::cli::{open_vault, passphrase, secret_value, Cli};
use crate::errors::Result;

/// Execute the `create` command.
pub fn execute(cli: &Cli, name: &str, value: Option<&str>) -> Result<()> {
    let vault = open_vault(cli)?;
    info!(%name, vault = %vault.path().display(), "creating secret");

    let secret = secret_value(name, value)?;
    let pass = passphrase(cli, true)?;
    vault.create(name, &secret, pass.as_deref().map(String::as_str))?;

    output::success(&format!("Secret '{name}' created"));
    if pass.is_none() {
        output::tip("Sealed with the default passphrase; use --ask-passphrase for a private one.");
    }

    Ok(())
}
