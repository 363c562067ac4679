//! `bpsecrets delete`: remove a secret from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::{Result, SecretsError};

/// Execute the `delete` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    let vault = open_vault(cli)?;

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete secret '{name}'?"))
            .default(false)
            .interact()
            .map_err(|e| SecretsError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            return Err(SecretsError::UserCancelled);
        }
    }

    vault.delete(name)?;
    output::success(&format!("Deleted secret '{name}'"));

    Ok(())
}
