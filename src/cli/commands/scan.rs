//! `bpsecrets scan`: show which secrets a document carries.
//!
//! Runs a strip pass over a copy of the document and prints where each
//! secret sits.  Values are never printed and nothing is written back.

use serde_json::Value;

use crate::cli::output;
use crate::cli::{resolve_path, Cli};
use crate::errors::{Result, SecretsError};
use crate::redact::{strip, ScanScope};

/// Execute the `scan` command.
pub fn execute(_cli: &Cli, file: &str, document: &str) -> Result<()> {
    let scope = ScanScope::for_document(document).ok_or_else(|| {
        SecretsError::CommandFailed(format!(
            "unknown document kind '{document}', expected blueprint, runbook, endpoint or provider"
        ))
    })?;

    let path = resolve_path(file)?;
    let contents = std::fs::read_to_string(&path)?;
    let tree: Value = serde_json::from_str(&contents)
        .map_err(|e| SecretsError::SerializationError(format!("{}: {e}", path.display())))?;

    let (_, redaction) = strip(tree, &scope, None);

    for skipped in &redaction.skipped {
        output::warning(&skipped.to_string());
    }

    if redaction.is_empty() {
        output::info(&format!("No secrets found in {file}"));
        return Ok(());
    }

    output::info(&format!(
        "{} secret(s) found in {file}",
        redaction.findings.len() + redaction.unchanged.len()
    ));
    output::print_findings_table(redaction.all());

    Ok(())
}
