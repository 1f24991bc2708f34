//! The replication probe itself.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use replctl_core::{
    load_dotenv, PgExecutor, ProbeConfig, Verifier, VerifyOptions, VerifyOutcome, DEFAULT_TABLE,
};
use tracing::info;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Seconds to wait for replication before checking the replica
    #[arg(long = "wait-secs", value_name = "SECS", default_value_t = 10)]
    pub wait_secs: u64,

    /// Probe table name
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,
}

pub async fn run_verify(args: VerifyArgs) -> Result<()> {
    load_dotenv();
    let config = ProbeConfig::from_env();

    // Name every missing setting for both endpoints before touching either.
    let mut incomplete = false;
    for endpoint in [&config.primary, &config.replica] {
        if let Err(e) = endpoint.validate() {
            eprintln!("✗ {e}");
            incomplete = true;
        }
    }
    if incomplete {
        std::process::exit(1);
    }

    info!(
        wait_secs = args.wait_secs,
        table = %args.table,
        "starting replication probe"
    );

    let executor = PgExecutor;
    let options = VerifyOptions {
        table: args.table,
        propagation_wait: Duration::from_secs(args.wait_secs),
    };
    let verifier = Verifier::new(&executor, &config, options)?;

    println!("Inserting test record into primary database...");
    let report = verifier.run().await?;
    println!("Test record: {}", report.record);

    if !matches!(report.outcome, VerifyOutcome::PrimaryWriteFailed { .. }) {
        match report.primary_seen {
            Some(true) => println!("✓ Record found in primary"),
            Some(false) => println!("✗ Record not found in primary database!"),
            None => println!("✗ Could not read the record back from primary"),
        }
    }

    match &report.outcome {
        VerifyOutcome::ReplicationConfirmed => {
            println!("✓ Record found in replica, replication is working correctly");
        }
        VerifyOutcome::ReplicationNotObserved {
            replica_error: None,
        } => {
            println!("✗ Record not found in replica database, replication may not be working");
        }
        VerifyOutcome::ReplicationNotObserved {
            replica_error: Some(detail),
        } => {
            println!("✗ Replica read failed ({detail}), replication state unknown");
        }
        VerifyOutcome::PrimaryWriteFailed { error } => {
            println!("✗ Primary write failed ({error}), verification aborted");
        }
    }
    println!("Outcome: {}", report.outcome);

    match report.outcome {
        VerifyOutcome::ReplicationConfirmed => Ok(()),
        VerifyOutcome::PrimaryWriteFailed { .. } => std::process::exit(1),
        VerifyOutcome::ReplicationNotObserved { .. } => std::process::exit(2),
    }
}
