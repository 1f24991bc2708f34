//! Per-endpoint connectivity check.

use anyhow::Result;
use clap::Args;
use replctl_core::{check_endpoint, load_dotenv, PgExecutor, ProbeConfig};

#[derive(Args, Debug)]
pub struct CheckArgs {}

pub async fn run_check(_args: CheckArgs) -> Result<()> {
    load_dotenv();
    let config = ProbeConfig::from_env();
    let executor = PgExecutor;

    let mut failed = false;
    for endpoint in [&config.primary, &config.replica] {
        println!("Testing connection to {}...", endpoint.label);
        match check_endpoint(&executor, endpoint).await {
            Ok(()) => println!("✓ Successfully connected to {}", endpoint.label),
            Err(e) => {
                println!("✗ Failed to connect to {}: {e}", endpoint.label);
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
