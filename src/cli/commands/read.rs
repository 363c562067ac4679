//! `bpsecrets read`: decrypt and print a single secret's value.

use crate::cli::{open_vault, passphrase, Cli};
use crate::errors::Result;

/// Execute the `read` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let vault = open_vault(cli)?;
    let pass = passphrase(cli, false)?;

    let value = vault.read(name, pass.as_deref().map(String::as_str))?;
    println!("{}", value.as_str());

    Ok(())
}
