//! Replication consistency verification.
//!
//! The probe inserts a uniquely marked row on the primary, sleeps for a
//! fixed propagation window (one wait, no polling, no early exit), then
//! reads the marker back from both endpoints and reports a tri-state
//! outcome. The primary readback is diagnostic only; the replica readback
//! decides pass or fail.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};

use crate::config::ProbeConfig;
use crate::endpoint::EndpointConfig;
use crate::error::Result;
use crate::executor::{valid_table_name, QueryMode, QueryOutput, SqlExecutor, SqlValue};

/// Default replication propagation allowance.
pub const DEFAULT_PROPAGATION_WAIT: Duration = Duration::from_secs(10);

/// Default probe table.
pub const DEFAULT_TABLE: &str = "testdata";

/// Tunables for one verification run.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Table the marker row is written to and read from
    pub table: String,
    /// Fixed wait between the primary write and the dual read
    pub propagation_wait: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            propagation_wait: DEFAULT_PROPAGATION_WAIT,
        }
    }
}

/// Tri-state result of a verification run.
///
/// `ReplicationNotObserved` covers both an empty replica read and a replica
/// read that itself failed; the two carry different diagnostic meaning and
/// are kept apart via `replica_error`, but share one outcome label.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyOutcome {
    /// The insert on the primary failed; nothing further was attempted
    PrimaryWriteFailed { error: String },
    /// The marker row was visible on the replica after the wait
    ReplicationConfirmed,
    /// The marker row was not observed on the replica
    ReplicationNotObserved { replica_error: Option<String> },
}

impl VerifyOutcome {
    /// Stable outcome label.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyOutcome::PrimaryWriteFailed { .. } => "primary_write_failed",
            VerifyOutcome::ReplicationConfirmed => "replication_confirmed",
            VerifyOutcome::ReplicationNotObserved { .. } => "replication_not_observed",
        }
    }
}

impl std::fmt::Display for VerifyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a caller needs to report one verification run.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    /// Marker value that was written to the primary
    pub record: String,
    pub outcome: VerifyOutcome,
    /// Whether the marker was visible on the primary after the wait;
    /// `None` if the primary readback itself failed. Diagnostic only.
    pub primary_seen: Option<bool>,
}

/// Generate a marker value that cannot plausibly collide with existing rows
/// or with previous probe runs: timestamp plus a random suffix.
pub fn generate_record_value() -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix: u16 = rand::thread_rng().gen();
    format!("repl-test-{stamp}-{suffix:04x}")
}

/// Orchestrates insert → wait → dual read → compare over two endpoints.
#[derive(Debug)]
pub struct Verifier<'a, E: SqlExecutor + ?Sized> {
    executor: &'a E,
    config: &'a ProbeConfig,
    options: VerifyOptions,
}

impl<'a, E: SqlExecutor + ?Sized> Verifier<'a, E> {
    /// Rejects an invalid table name or an incomplete endpoint descriptor
    /// before any connection is attempted.
    pub fn new(executor: &'a E, config: &'a ProbeConfig, options: VerifyOptions) -> Result<Self> {
        valid_table_name(&options.table)?;
        config.primary.validate()?;
        config.replica.validate()?;
        Ok(Self {
            executor,
            config,
            options,
        })
    }

    /// Run one probe with a freshly generated marker value.
    pub async fn run(&self) -> Result<VerifyReport> {
        self.run_with_record(generate_record_value()).await
    }

    /// Run one probe with a caller-supplied marker value.
    pub async fn run_with_record(&self, record: String) -> Result<VerifyReport> {
        let table = &self.options.table;
        let insert = format!("INSERT INTO {table} (value) VALUES ($1)");
        let select = format!("SELECT id, value, created_at FROM {table} WHERE value = $1");
        let params = [SqlValue::Text(record.clone())];

        info!(record = %record, "inserting test record into primary database");
        if let Err(e) = self
            .executor
            .execute(&self.config.primary, &insert, &params, QueryMode::Write)
            .await
        {
            warn!(error = %e, "primary write failed, aborting verification");
            return Ok(VerifyReport {
                record,
                outcome: VerifyOutcome::PrimaryWriteFailed {
                    error: e.to_string(),
                },
                primary_seen: None,
            });
        }

        info!(
            wait_secs = self.options.propagation_wait.as_secs_f64(),
            "waiting for replication to occur"
        );
        tokio::time::sleep(self.options.propagation_wait).await;

        let primary_seen = match self
            .executor
            .execute(&self.config.primary, &select, &params, QueryMode::Read)
            .await
        {
            Ok(QueryOutput::Rows(rows)) => Some(!rows.is_empty()),
            Ok(QueryOutput::RowsAffected(_)) => Some(false),
            Err(_) => None,
        };
        match primary_seen {
            Some(true) => info!("record found in primary"),
            Some(false) => {
                warn!("record not found in primary; primary-side issue, not a replication failure")
            }
            None => warn!("primary readback failed"),
        }

        let outcome = match self
            .executor
            .execute(&self.config.replica, &select, &params, QueryMode::Read)
            .await
        {
            Ok(QueryOutput::Rows(rows)) if !rows.is_empty() => {
                info!("record found in replica, replication is working");
                VerifyOutcome::ReplicationConfirmed
            }
            Ok(_) => {
                warn!("record not found in replica after the wait");
                VerifyOutcome::ReplicationNotObserved {
                    replica_error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "replica read failed, replication state unknown");
                VerifyOutcome::ReplicationNotObserved {
                    replica_error: Some(e.to_string()),
                }
            }
        };

        Ok(VerifyReport {
            record,
            outcome,
            primary_seen,
        })
    }
}

/// Build a trivial round-trip (`SELECT 1`) check against one endpoint.
///
/// Used by connectivity checks; succeeds iff a session can be established
/// and a statement executed.
pub async fn check_endpoint<E: SqlExecutor + ?Sized>(
    executor: &E,
    endpoint: &EndpointConfig,
) -> Result<()> {
    endpoint.validate()?;
    executor
        .execute(endpoint, "SELECT 1", &[], QueryMode::Read)
        .await
        .map(|_| ())
}
