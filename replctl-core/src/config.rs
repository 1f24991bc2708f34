//! Process configuration.
//!
//! Connection parameters come from `PRIMARY_*` / `REPLICA_*` environment
//! variables, optionally seeded from `.env` files. The result is an explicit
//! [`ProbeConfig`] constructed once at startup and passed by reference into
//! the executor and verifier; core logic never reads the environment on its
//! own.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::endpoint::EndpointConfig;

/// Load environment variables from `.env` files in multiple locations.
///
/// Priority order (highest to lowest):
/// 1. Environment variables already set
/// 2. Current directory `.env`
/// 3. `~/.replctl/.env`
///
/// This allows a globally installed binary to keep its credentials in
/// `~/.replctl/.env` while any directory-local `.env` overrides them.
pub fn load_dotenv() {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(format!("current directory ({})", path.display()));
        debug!("loaded .env from current directory: {}", path.display());
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            // dotenvy doesn't overwrite existing vars, so this is safe
            match dotenvy::from_path(&env_file) {
                Ok(_) => {
                    loaded_from.push(format!("~/.replctl/.env ({})", env_file.display()));
                    debug!("loaded .env from ~/.replctl: {}", env_file.display());
                }
                Err(e) => {
                    debug!("failed to load ~/.replctl/.env: {}", e);
                }
            }
        }
    }

    if loaded_from.is_empty() {
        debug!("no .env files found (current dir or ~/.replctl)");
    } else {
        info!("loaded configuration from: {}", loaded_from.join(", "));
    }
}

/// The replctl config directory path (`~/.replctl`)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".replctl"))
}

/// Connection configuration for both endpoints of a probe run.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub primary: EndpointConfig,
    pub replica: EndpointConfig,
}

impl ProbeConfig {
    /// Build the configuration from the process environment.
    ///
    /// Missing variables produce empty descriptor fields; they are rejected
    /// (with every absent name listed) by [`EndpointConfig::validate`] when
    /// an operation actually needs that endpoint.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Split out from [`ProbeConfig::from_env`] so tests can supply settings
    /// without mutating process-wide environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            primary: endpoint_from("primary", &lookup),
            replica: endpoint_from("replica", &lookup),
        }
    }
}

fn endpoint_from(label: &str, lookup: &impl Fn(&str) -> Option<String>) -> EndpointConfig {
    let prefix = label.to_uppercase();
    let var = |name: &str| lookup(&format!("{prefix}_{name}")).unwrap_or_default();
    EndpointConfig {
        label: label.to_string(),
        server: var("SERVER"),
        database: var("DATABASE"),
        username: var("USERNAME"),
        password: var("PASSWORD"),
        driver: var("DRIVER"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup_reads_both_prefixes() {
        let cfg = ProbeConfig::from_lookup(|key| {
            let value = match key {
                "PRIMARY_SERVER" => "primary.db:5432",
                "PRIMARY_DATABASE" => "appdb",
                "PRIMARY_USERNAME" => "probe",
                "PRIMARY_PASSWORD" => "s3cret",
                "PRIMARY_DRIVER" => "postgres",
                "REPLICA_SERVER" => "replica.db:5432",
                "REPLICA_DATABASE" => "appdb",
                "REPLICA_USERNAME" => "probe_ro",
                "REPLICA_PASSWORD" => "s3cret2",
                "REPLICA_DRIVER" => "postgres",
                _ => return None,
            };
            Some(value.to_string())
        });

        assert!(cfg.primary.validate().is_ok());
        assert!(cfg.replica.validate().is_ok());
        assert_eq!(cfg.primary.label, "primary");
        assert_eq!(cfg.replica.server, "replica.db:5432");
        assert_eq!(cfg.replica.username, "probe_ro");
    }

    #[test]
    fn test_unset_variables_become_missing_fields() {
        let cfg = ProbeConfig::from_lookup(|key| match key {
            "PRIMARY_SERVER" => Some("primary.db".to_string()),
            _ => None,
        });

        let missing = cfg.primary.missing_fields();
        assert!(!missing.contains(&"PRIMARY_SERVER".to_string()));
        assert!(missing.contains(&"PRIMARY_DATABASE".to_string()));
        assert!(missing.contains(&"PRIMARY_PASSWORD".to_string()));
        assert_eq!(cfg.replica.missing_fields().len(), 5);
    }

    #[test]
    fn test_config_dir_returns_path() {
        let dir = config_dir();
        assert!(dir.is_some());
        if let Some(path) = dir {
            assert!(path.ends_with(".replctl"));
        }
    }
}
