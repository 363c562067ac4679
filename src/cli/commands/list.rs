//! `bpsecrets list`: display all secrets in a table.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let vault = open_vault(cli)?;
    let secrets = vault.list()?;

    output::info(&format!("{} secret(s)", secrets.len()));
    output::print_secrets_table(&secrets);

    Ok(())
}
