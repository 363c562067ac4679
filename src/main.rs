use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blueprint_secrets::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // Diagnostics go to stderr; BPSECRETS_LOG overrides the verbosity flag.
    let filter = EnvFilter::try_from_env("BPSECRETS_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("blueprint_secrets=debug")
        } else {
            EnvFilter::new("blueprint_secrets=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();

    let result = match cli.command {
        Commands::Create { ref name, ref value } => {
            blueprint_secrets::cli::commands::create::execute(&cli, name, value.as_deref())
        }
        Commands::Read { ref name } => blueprint_secrets::cli::commands::read::execute(&cli, name),
        Commands::Update { ref name, ref value } => {
            blueprint_secrets::cli::commands::update::execute(&cli, name, value.as_deref())
        }
        Commands::Delete { ref name, force } => {
            blueprint_secrets::cli::commands::delete::execute(&cli, name, force)
        }
        Commands::List => blueprint_secrets::cli::commands::list::execute(&cli),
        Commands::Scan {
            ref file,
            ref document,
        } => blueprint_secrets::cli::commands::scan::execute(&cli, file, document),
    };

    if let Err(e) = result {
        blueprint_secrets::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
