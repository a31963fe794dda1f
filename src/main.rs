mod cli;
mod client;
mod domain;
mod email;
mod probe;
mod report;
mod result;
mod token;

use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use crossterm::style::Stylize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::{
    cli::Cli,
    client::{ClientConfig, GithubApi},
    email::EmailAddress,
    probe::ProbeOrchestrator,
    result::{GhprobeError, Result},
    token::{EnvFileStore, TokenResolver},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing();
    if let Err(e) = color_eyre::install() {
        error!(error = %e, "Failed to install error reporting hooks");
    }

    if !cli.json && !cli.no_banner {
        report::print_banner();
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format!("Error: {e}").red());
            if matches!(e, GhprobeError::Interrupted) {
                eprintln!(
                    "{}",
                    "The temporary repository may not have been deleted.".yellow()
                );
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    // Rejected locally, before any token lookup or network traffic.
    let email: EmailAddress = cli.email.parse()?;

    let resolver = TokenResolver::new(EnvFileStore::default(), !cli.no_browser);
    let token = resolver.resolve().await?;

    let api = Arc::new(GithubApi::new(ClientConfig::new(token))?);
    let orchestrator = ProbeOrchestrator::new(api);

    let outcome = tokio::select! {
        outcome = orchestrator.run(&email, cli.keep) => outcome?,
        _ = tokio::signal::ctrl_c() => return Err(GhprobeError::Interrupted),
    };

    if cli.json {
        report::print_json(&outcome);
    } else {
        report::print_outcome(&outcome);
    }

    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ghprobe=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
