//! replctl - primary/replica replication consistency probe
//!
//! This is the entry point for the replctl command-line tool, which provides:
//! - Replication verification (insert on primary, wait, read both endpoints)
//! - Probe table dumps from both endpoints (`dump` subcommand)
//! - Endpoint connectivity checks (`check` subcommand)

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "replctl",
    author,
    version,
    about = "Verify that writes to a primary database become visible on its replica",
    long_about = "Insert a uniquely marked probe row on the primary endpoint, wait a fixed \
                  propagation window, then read both endpoints and report whether replication \
                  delivered the row. Endpoints are configured via PRIMARY_*/REPLICA_* \
                  environment variables (a .env file is honored)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the replication probe: insert, wait, dual read, compare
    Verify(commands::verify::VerifyArgs),
    /// Print every row of the probe table from both endpoints
    Dump(commands::dump::DumpArgs),
    /// Attempt a trivial round-trip against each configured endpoint
    Check(commands::check::CheckArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Verify(args) => commands::run_verify(args).await?,
        Commands::Dump(args) => commands::run_dump(args).await?,
        Commands::Check(args) => commands::run_check(args).await?,
        Commands::Completions(args) => run_completions(args)?,
    }
    Ok(())
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
