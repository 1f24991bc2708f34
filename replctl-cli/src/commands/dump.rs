//! Dump the probe table from both endpoints.

use anyhow::Result;
use clap::Args;
use replctl_core::{
    load_dotenv, valid_table_name, PgExecutor, ProbeConfig, QueryMode, QueryOutput, SqlExecutor,
    DEFAULT_TABLE,
};
use tracing::info;

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Probe table name
    #[arg(long, default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Emit rows as JSON instead of plain lines
    #[arg(long)]
    pub json: bool,
}

pub async fn run_dump(args: DumpArgs) -> Result<()> {
    load_dotenv();
    let config = ProbeConfig::from_env();
    let table = valid_table_name(&args.table)?;
    let query = format!("SELECT id, value, created_at FROM {table} ORDER BY id");
    info!(table = %table, "dumping probe table from both endpoints");

    let executor = PgExecutor;
    for endpoint in [&config.primary, &config.replica] {
        if let Err(e) = endpoint.validate() {
            eprintln!("✗ {e}");
            continue;
        }

        println!("\nReading from {}...", endpoint.label);
        match executor.execute(endpoint, &query, &[], QueryMode::Read).await {
            Ok(QueryOutput::Rows(rows)) => {
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else {
                    if rows.is_empty() {
                        println!("No rows found.");
                    }
                    for row in &rows {
                        let line = row
                            .columns()
                            .iter()
                            .map(|(name, value)| format!("{name}: {value}"))
                            .collect::<Vec<_>>()
                            .join(", ");
                        println!("{line}");
                    }
                    println!("Total rows: {}", rows.len());
                }
            }
            Ok(QueryOutput::RowsAffected(n)) => {
                // a read should never land here
                eprintln!("✗ unexpected write result ({n} rows affected)");
            }
            Err(e) => eprintln!("✗ {e}"),
        }
    }

    Ok(())
}
