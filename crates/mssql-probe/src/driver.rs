//! Driver seam between the probe and the TDS wire client.
//!
//! The probe only needs four things from a database connection: the server
//! version, a catalog lookup, a `CREATE DATABASE`, and a close. They are
//! expressed as traits so the probe logic can run against the real
//! [`mssql_client`] driver or an in-memory fake.
//!
//! # Native Async Traits
//!
//! The probe is generic over these traits and never needs trait objects, so
//! they use native `async fn` (Rust 2024 Edition).

use mssql_client::{Client, Ready};

use crate::config::ConnectionConfig;
use crate::error::{ProbeError, Result};

/// Query used to identify the server build.
pub const VERSION_QUERY: &str = "SELECT @@VERSION";

/// Catalog lookup for a database by name.
pub const DATABASE_EXISTS_QUERY: &str = "SELECT COUNT(*) FROM sys.databases WHERE name = @p1";

/// Provides a usable [`Connector`], or reports why none is available.
pub trait DriverLoader {
    /// Connector produced by this loader.
    type Connector: Connector;

    /// Load the driver.
    fn load(&self) -> Result<Self::Connector>;
}

/// Opens sessions against a server.
#[allow(async_fn_in_trait)]
pub trait Connector {
    /// Session type produced by a successful connect.
    type Session: Session;

    /// Open one connection. No retries.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Self::Session>;
}

/// An open connection, as seen by the probe.
#[allow(async_fn_in_trait)]
pub trait Session {
    /// Run [`VERSION_QUERY`] and return the first column of the first row.
    async fn server_version(&mut self) -> Result<String>;

    /// Whether a database with this name is present in `sys.databases`.
    async fn database_exists(&mut self, name: &str) -> Result<bool>;

    /// Issue `CREATE DATABASE` for `name`.
    async fn create_database(&mut self, name: &str) -> Result<()>;

    /// Release the connection.
    async fn close(self) -> Result<()>;
}

/// Quote a SQL Server identifier with brackets, doubling any `]`.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// The statically linked TDS driver from `mssql-client`.
///
/// Loading always succeeds: the driver is compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinDriver;

impl DriverLoader for BuiltinDriver {
    type Connector = TdsConnector;

    fn load(&self) -> Result<TdsConnector> {
        tracing::debug!(driver = "mssql-client", "driver loaded");
        Ok(TdsConnector)
    }
}

/// [`Connector`] backed by [`mssql_client::Client`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TdsConnector;

impl Connector for TdsConnector {
    type Session = TdsSession;

    async fn connect(&self, config: &ConnectionConfig) -> Result<TdsSession> {
        tracing::debug!(
            host = %config.server,
            port = config.port,
            user = %config.user,
            database = %config.database,
            "connecting"
        );

        let client = Client::connect(config.to_client_config()).await?;

        tracing::info!(host = %config.server, port = config.port, "connection established");
        Ok(TdsSession { client })
    }
}

/// An open `mssql-client` connection.
#[derive(Debug)]
pub struct TdsSession {
    client: Client<Ready>,
}

impl Session for TdsSession {
    async fn server_version(&mut self) -> Result<String> {
        let mut rows = self.client.query(VERSION_QUERY, &[]).await?;

        match rows.next() {
            Some(result) => {
                let row = result?;
                row.get::<String>(0).map_err(ProbeError::connection)
            }
            None => Err(ProbeError::connection("SELECT @@VERSION returned no rows")),
        }
    }

    async fn database_exists(&mut self, name: &str) -> Result<bool> {
        let mut rows = self.client.query(DATABASE_EXISTS_QUERY, &[&name]).await?;

        let count = match rows.next() {
            Some(result) => result?.get::<i32>(0).map_err(ProbeError::connection)?,
            None => 0,
        };
        tracing::debug!(database = name, count, "catalog lookup");
        Ok(count > 0)
    }

    async fn create_database(&mut self, name: &str) -> Result<()> {
        let sql = format!("CREATE DATABASE {}", quote_identifier(name));
        self.client.execute(&sql, &[]).await?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("appdb"), "[appdb]");
        assert_eq!(quote_identifier("my db"), "[my db]");
        assert_eq!(quote_identifier("odd]name"), "[odd]]name]");
        assert_eq!(quote_identifier("x]; DROP DATABASE y; --"), "[x]]; DROP DATABASE y; --]");
    }

    #[test]
    fn test_builtin_driver_always_loads() {
        assert!(BuiltinDriver.load().is_ok());
    }
}
