//! Error types for omnisql
//!
//! This module defines the error hierarchy used throughout the application.
//! We use `thiserror` for library-style errors with clear error chains.
//!
//! Two enums matter to callers: [`SqlError`] covers every operational failure
//! a session can surface (connection, dialect, query and mismatch kinds), and
//! [`FetchError`] carries the two control-flow outcomes of the row-fetch
//! protocol (`RecordSetEnd`, `ReturnsNoRecords`) that are always consumed by
//! the spooling loop and never shown to the user.

use std::io;

/// Operational errors surfaced by a SQL session.
///
/// The top-level command dispatch prints recoverable kinds as a short
/// `Kind: message` line; non-recoverable kinds are reported with the full
/// diagnostic chain (see [`SqlError::is_recoverable`]).
#[derive(Debug, thiserror::Error)]
pub enum SqlError {
    /// A connection is already open; the session holds at most one
    #[error("A connection has already been established with {0}. Disconnect the existing session first")]
    ConnectionExists(String),

    /// The native driver refused or dropped the connection attempt
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An operation that needs a live connection was called without one
    #[error("No SQL connection has been established. Establish a connection first with the 'connect' command")]
    Disconnected,

    /// The connection string is neither a known alias nor a parseable URL
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    /// The dialect is recognized but its driver is not compiled into this build
    #[error("No driver for dialect '{dialect}' is available in this build. Required packages: {packages}")]
    MissingDriver { dialect: String, packages: String },

    /// The dialect is unknown or the requested operation has no meaning for it
    #[error("Dialect error: {0}")]
    Dialect(String),

    /// The native driver reported a query failure; carries the driver message
    #[error("Query failed: {0}")]
    Query(String),

    /// The user interrupted the running query
    #[error("Query interrupted by user")]
    Interrupted,

    /// A query minted by one backend was handed to a different backend
    #[error("{0}")]
    BackendMismatch(String),
}

impl SqlError {
    /// Short kind tag used by the top-level `Kind: message` display.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlError::ConnectionExists(_) => "ConnectionExists",
            SqlError::ConnectionFailed(_) => "ConnectionFailed",
            SqlError::Disconnected => "Disconnected",
            SqlError::InvalidUrl(_) => "InvalidUrl",
            SqlError::MissingDriver { .. } => "MissingDriver",
            SqlError::Dialect(_) => "Dialect",
            SqlError::Query(_) => "Query",
            SqlError::Interrupted => "Interrupted",
            SqlError::BackendMismatch(_) => "BackendMismatch",
        }
    }

    /// True for kinds that represent expected operational conditions rather
    /// than programming errors.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SqlError::BackendMismatch(_))
    }
}

/// Outcome of a single `fetch_row` call.
///
/// `RecordSetEnd` and `ReturnsNoRecords` are loop-termination signals, not
/// failures; the spooling protocol catches both at its boundary.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The active record set has no further rows
    #[error("Reached the end of the record set")]
    RecordSetEnd,

    /// The active statement produces no records at all
    #[error("The provided query returns no records")]
    ReturnsNoRecords,

    /// A genuine driver failure while fetching
    #[error(transparent)]
    Query(#[from] SqlError),
}

impl FetchError {
    /// True when this is one of the two normal loop-termination signals.
    pub fn is_end_of_records(&self) -> bool {
        matches!(self, FetchError::RecordSetEnd | FetchError::ReturnsNoRecords)
    }
}

/// Configuration loading/parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Home directory not found
    #[error("Could not determine home directory")]
    NoHomeDir,

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("Failed to write configuration: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// IO failure while reading or writing the config file
    #[error("Configuration IO error: {0}")]
    Io(#[from] io::Error),
}

/// Specialized Result type for SQL operations
pub type SqlResult<T> = std::result::Result<T, SqlError>;

/// Specialized Result type for row fetches
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Specialized Result type for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(SqlError::Disconnected.kind(), "Disconnected");
        assert_eq!(SqlError::Query("x".into()).kind(), "Query");
        assert_eq!(
            SqlError::BackendMismatch("x".into()).kind(),
            "BackendMismatch"
        );
    }

    #[test]
    fn test_end_of_records_signals() {
        assert!(FetchError::RecordSetEnd.is_end_of_records());
        assert!(FetchError::ReturnsNoRecords.is_end_of_records());
        assert!(!FetchError::Query(SqlError::Disconnected).is_end_of_records());
    }

    #[test]
    fn test_mismatch_is_not_recoverable() {
        assert!(SqlError::Interrupted.is_recoverable());
        assert!(!SqlError::BackendMismatch("foreign query".into()).is_recoverable());
    }

    #[test]
    fn test_missing_driver_message_names_packages() {
        let err = SqlError::MissingDriver {
            dialect: "oracle".into(),
            packages: "oracle".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("oracle"));
        assert!(msg.contains("Required packages"));
    }
}
