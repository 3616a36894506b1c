//! # mssql-probe
//!
//! Connectivity probe for SQL Server.
//!
//! One run of the probe:
//!
//! ```text
//! load driver -> (bootstrap -> load driver) -> resolve config
//!     -> connect -> SELECT @@VERSION -> database step -> close -> report
//! ```
//!
//! Configuration comes from `MSSQL_SERVER`, `MSSQL_PORT`, `MSSQL_USER`,
//! `MSSQL_PASSWORD` and `MSSQL_DATABASE` (see [`config`]). The wire protocol
//! is handled by [`mssql_client`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use mssql_probe::{BuiltinDriver, ConnectionConfig, ConnectionProbe, DriverLoader, EnvSnapshot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mssql_probe::ProbeError> {
//!     let config = ConnectionConfig::resolve(&EnvSnapshot::capture())?;
//!     let connector = BuiltinDriver.load()?;
//!
//!     let report = ConnectionProbe::new(connector).test_connection(&config).await?;
//!     println!("{}", report.version_preview());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod app;
pub mod bootstrap;
pub mod config;
pub mod driver;
pub mod error;
pub mod probe;
pub mod report;

pub use app::{App, Outcome};
pub use bootstrap::{BootstrapError, CommandRunner, DriverBootstrap, ShellCommand, ShellRunner};
pub use config::{ConnectionConfig, EncryptMode, EnvSnapshot};
pub use driver::{BuiltinDriver, Connector, DriverLoader, Session, TdsConnector, TdsSession};
pub use error::{ProbeError, Result};
pub use probe::{ConnectionProbe, DatabaseStep, ProbeReport};
pub use report::Reporter;
