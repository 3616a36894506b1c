//! Probe error types.

use std::num::ParseIntError;

use thiserror::Error;

use crate::bootstrap::BootstrapError;

/// Errors that can occur while probing a SQL Server instance.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProbeError {
    /// `MSSQL_PORT` is not a valid port number.
    #[error("invalid port {value:?}: {source}")]
    InvalidPort {
        /// Raw value read from the environment.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: ParseIntError,
    },

    /// A boolean environment flag has an unrecognized value.
    #[error("invalid value {value:?} for {name}")]
    InvalidFlag {
        /// Environment variable name.
        name: &'static str,
        /// Raw value read from the environment.
        value: String,
    },

    /// Connecting, querying or creating the database failed.
    ///
    /// Every failure after configuration is reported through this single
    /// variant; the probe does not distinguish partial failures.
    #[error("{0}")]
    Connection(String),

    /// The wire driver could not be loaded.
    #[error("driver unavailable: {0}")]
    DriverUnavailable(String),

    /// Installing the driver failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}

impl ProbeError {
    /// Create a connection error from any displayable message.
    pub fn connection(message: impl std::fmt::Display) -> Self {
        Self::Connection(message.to_string())
    }

    /// Check if this error was raised while resolving configuration,
    /// i.e. before any network call.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidPort { .. } | Self::InvalidFlag { .. })
    }
}

impl From<mssql_client::Error> for ProbeError {
    fn from(err: mssql_client::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/// Result type for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_classified() {
        let source = "abc".parse::<u16>().unwrap_err();
        let err = ProbeError::InvalidPort {
            value: "abc".into(),
            source,
        };
        assert!(err.is_config_error());
        assert!(err.to_string().contains("\"abc\""));

        assert!(!ProbeError::connection("login failed").is_config_error());
    }

    #[test]
    fn test_connection_error_displays_message_only() {
        let err = ProbeError::connection("Login failed for user 'sa'.");
        assert_eq!(err.to_string(), "Login failed for user 'sa'.");
    }

    #[test]
    fn test_driver_errors_become_connection_errors() {
        let driver_err = mssql_client::Error::Query("No rows returned".into());
        let expected = driver_err.to_string();
        let err: ProbeError = driver_err.into();
        assert!(matches!(err, ProbeError::Connection(ref msg) if *msg == expected));
    }
}
