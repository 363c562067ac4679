//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::redact::{Finding, FindingStatus};
use crate::vault::SecretMetadata;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of secret metadata (Name, Created, Updated).
pub fn print_secrets_table(secrets: &[SecretMetadata]) {
    if secrets.is_empty() {
        info("No secrets in this vault yet.");
        tip("Run `bpsecrets create <NAME>` to add your first secret.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Created", "Updated"]);

    for s in secrets {
        table.add_row(vec![
            s.name.clone(),
            s.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            s.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print a table of findings (Kind, Name, Path, Context).  Never values.
pub fn print_findings_table<'a>(findings: impl IntoIterator<Item = &'a Finding>) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Kind", "Name", "Path", "Context", "Status"]);

    for f in findings {
        let status = match f.status {
            FindingStatus::NewOrChanged => "strip",
            FindingStatus::Unchanged => "keep",
        };
        table.add_row(vec![
            f.kind.to_string(),
            f.name.clone(),
            f.path.to_string(),
            f.context.clone(),
            status.to_string(),
        ]);
    }

    println!("{table}");
}
