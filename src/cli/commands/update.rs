//! `bpsecrets update`: replace the value of an existing secret.

use tracing::info;

use crate::cli::output;
use crate::cli::{open_vault, passphrase, secret_value, Cli};
use crate::errors::Result;

/// Execute the `update` command.
pub fn execute(cli: &Cli, name: &str, value: Option<&str>) -> Result<()> {
    let vault = open_vault(cli)?;
    info!(%name, vault = %vault.path().display(), "updating secret");

    let secret = secret_value(name, value)?;
    let pass = passphrase(cli, true)?;
    let metadata = vault.update(name, &secret, pass.as_deref().map(String::as_str))?;

    output::success(&format!(
        "Secret '{name}' updated at {}",
        metadata.updated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    Ok(())
}
