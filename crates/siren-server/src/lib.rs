//! Siren server wiring: configuration and the ETA oracles chosen at startup.

pub mod config;
pub mod oracle;

pub use config::{ConfigError, ServerConfig};
pub use oracle::{Oracle, OracleError, OsrmOracle};
