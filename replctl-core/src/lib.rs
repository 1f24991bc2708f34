pub mod config;
pub mod endpoint;
pub mod error;
pub mod executor;
pub mod verify;

pub use config::{config_dir, load_dotenv, ProbeConfig};
pub use endpoint::EndpointConfig;
pub use error::{ProbeError, Result};
pub use executor::{
    valid_table_name, PgExecutor, QueryMode, QueryOutput, SqlExecutor, SqlRow, SqlValue,
};
pub use verify::{
    check_endpoint, generate_record_value, VerifyOptions, VerifyOutcome, VerifyReport, Verifier,
    DEFAULT_PROPAGATION_WAIT, DEFAULT_TABLE,
};
