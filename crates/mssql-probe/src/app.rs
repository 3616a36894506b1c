//! Top-level probe sequence: load driver, bootstrap if needed, probe, report.

use std::io::{self, Write};
use std::process::ExitCode;

use crate::bootstrap::{CommandRunner, DriverBootstrap};
use crate::config::{ConnectionConfig, EnvSnapshot};
use crate::driver::DriverLoader;
use crate::error::ProbeError;
use crate::probe::{ConnectionProbe, DatabaseStep};
use crate::report::Reporter;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Driver available, connection and verification succeeded.
    Success,
    /// Bootstrap, configuration or connection failed.
    Failure,
}

impl Outcome {
    /// Process exit code: 0 on success, 1 otherwise.
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        ExitCode::from(outcome.exit_code())
    }
}

/// Everything a run needs besides the environment and the output sink.
#[derive(Debug)]
pub struct App<L, R> {
    loader: L,
    runner: R,
    bootstrap: DriverBootstrap,
    database_step: DatabaseStep,
}

impl<L: DriverLoader, R: CommandRunner> App<L, R> {
    /// Create an app with the default bootstrap plan and database step.
    pub fn new(loader: L, runner: R) -> Self {
        Self {
            loader,
            runner,
            bootstrap: DriverBootstrap::default(),
            database_step: DatabaseStep::default(),
        }
    }

    /// Replace the bootstrap plan.
    #[must_use]
    pub fn bootstrap(mut self, bootstrap: DriverBootstrap) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set the database step policy.
    #[must_use]
    pub fn database_step(mut self, step: DatabaseStep) -> Self {
        self.database_step = step;
        self
    }

    /// Run one probe, writing the report to `reporter`.
    ///
    /// Only a failure to write the report is returned as an error.
    pub async fn run<W: Write>(
        &self,
        env: &EnvSnapshot,
        reporter: &mut Reporter<W>,
    ) -> io::Result<Outcome> {
        reporter.banner()?;

        let connector = match self.loader.load() {
            Ok(connector) => {
                reporter.driver_ready()?;
                connector
            }
            Err(err) => {
                tracing::warn!(error = %err, "driver unavailable, running bootstrap");
                reporter.driver_missing(&err)?;
                match self.bootstrap_and_reload() {
                    Ok(connector) => {
                        reporter.bootstrap_succeeded()?;
                        connector
                    }
                    Err(err) => {
                        reporter.bootstrap_failed(&err)?;
                        return Ok(Outcome::Failure);
                    }
                }
            }
        };

        let config = match ConnectionConfig::resolve(env) {
            Ok(config) => config,
            Err(err) => {
                reporter.config_failed(&err)?;
                reporter.check_configuration()?;
                return Ok(Outcome::Failure);
            }
        };
        tracing::debug!(?config, "configuration resolved");

        reporter.connecting(&config)?;
        let probe = ConnectionProbe::new(connector).database_step(self.database_step);

        match probe.test_connection(&config).await {
            Ok(report) => {
                reporter.probe_succeeded(&report)?;
                reporter.all_good()?;
                Ok(Outcome::Success)
            }
            Err(err) => {
                tracing::debug!(error = %err, "probe failed");
                reporter.probe_failed(&err)?;
                reporter.check_configuration()?;
                Ok(Outcome::Failure)
            }
        }
    }

    fn bootstrap_and_reload(&self) -> Result<L::Connector, ProbeError> {
        self.bootstrap.ensure_driver_available(&self.runner)?;
        self.loader.load()
    }
}
