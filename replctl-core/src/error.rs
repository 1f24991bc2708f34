/// Structured error types for replctl-core.
///
/// Uses `thiserror` for better API surface and error composition.
/// The binary crate (replctl-cli) can still use `anyhow` for convenience,
/// but library consumers get structured, composable errors.
///
/// Note that "replication not observed" is deliberately absent here: it is
/// a verification *outcome* (see [`crate::verify::VerifyOutcome`]), not a
/// tool malfunction, and must never surface as a process error.

use thiserror::Error;

/// Main error type for replctl-core operations
#[derive(Error, Debug)]
pub enum ProbeError {
    /// One or more required connection settings are absent or empty
    #[error("missing connection settings for {endpoint}: {}", .fields.join(", "))]
    ConfigMissing {
        endpoint: String,
        fields: Vec<String>,
    },

    /// The driver could not establish a session with the endpoint
    #[error("failed to connect to {endpoint}: {source}")]
    ConnectionFailed {
        endpoint: String,
        source: sqlx::Error,
    },

    /// The driver rejected or failed to execute a statement
    #[error("query failed on {endpoint}: {source}")]
    QueryFailed {
        endpoint: String,
        source: sqlx::Error,
    },

    /// A table name that is not a plain (optionally schema-qualified) identifier
    #[error("invalid table name: {0:?}")]
    InvalidTable(String),
}

/// Result type alias for replctl-core operations
pub type Result<T> = std::result::Result<T, ProbeError>;

impl ProbeError {
    /// Create a missing-config error for an endpoint
    pub fn config_missing(endpoint: impl Into<String>, fields: Vec<String>) -> Self {
        Self::ConfigMissing {
            endpoint: endpoint.into(),
            fields,
        }
    }

    /// Create a connection error for an endpoint
    pub fn connection_failed(endpoint: impl Into<String>, source: sqlx::Error) -> Self {
        Self::ConnectionFailed {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// Create a query error for an endpoint
    pub fn query_failed(endpoint: impl Into<String>, source: sqlx::Error) -> Self {
        Self::QueryFailed {
            endpoint: endpoint.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_missing_names_every_field() {
        let err = ProbeError::config_missing(
            "Primary DB",
            vec!["PRIMARY_SERVER".into(), "PRIMARY_PASSWORD".into()],
        );
        assert_eq!(
            err.to_string(),
            "missing connection settings for Primary DB: PRIMARY_SERVER, PRIMARY_PASSWORD"
        );
    }

    #[test]
    fn test_query_failed_display_carries_label() {
        let err = ProbeError::query_failed("Replica DB", sqlx::Error::PoolClosed);
        assert!(err.to_string().starts_with("query failed on Replica DB:"));
    }
}
