//! The probe itself: connect, identify the server, verify the database.

use crate::config::{ADMIN_DATABASE, ConnectionConfig};
use crate::driver::{Connector, Session};
use crate::error::Result;

/// Number of characters of `@@VERSION` shown in the report.
pub const VERSION_PREVIEW_CHARS: usize = 50;

/// What to do after the database existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseStep {
    /// Issue `CREATE DATABASE` whatever the existence check returned.
    ///
    /// This is the long-standing behaviour of the probe: against an existing
    /// database (including the default `master`) the create fails and so
    /// does the probe.
    #[default]
    AlwaysCreate,
    /// Issue `CREATE DATABASE` only when the database is missing.
    ///
    /// The server refuses a login to a database that does not exist, so the
    /// steps run on a session logged in to [`ADMIN_DATABASE`]. A login to the
    /// target database follows to confirm it is usable.
    CreateIfMissing,
}

/// Outcome of a successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Full `@@VERSION` string.
    pub server_version: String,
    /// Database that was checked.
    pub database: String,
    /// Result of the existence check, before any create.
    pub database_existed: bool,
    /// Whether `CREATE DATABASE` was issued.
    pub create_issued: bool,
}

impl ProbeReport {
    /// The first [`VERSION_PREVIEW_CHARS`] characters of the server version.
    #[must_use]
    pub fn version_preview(&self) -> &str {
        truncate_chars(&self.server_version, VERSION_PREVIEW_CHARS)
    }
}

/// Runs one probe attempt with a given connector.
#[derive(Debug)]
pub struct ConnectionProbe<C> {
    connector: C,
    database_step: DatabaseStep,
}

impl<C: Connector> ConnectionProbe<C> {
    /// Create a probe using the default [`DatabaseStep`].
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            database_step: DatabaseStep::default(),
        }
    }

    /// Set the database step policy.
    #[must_use]
    pub fn database_step(mut self, step: DatabaseStep) -> Self {
        self.database_step = step;
        self
    }

    /// Connect, query the version and run the database step.
    ///
    /// Each session is closed on every path once connected. If a step fails
    /// and the close fails too, the step error is returned and the close
    /// error is only logged.
    pub async fn test_connection(&self, config: &ConnectionConfig) -> Result<ProbeReport> {
        match self.database_step {
            DatabaseStep::AlwaysCreate => self.run_session(config, &config.database).await,
            DatabaseStep::CreateIfMissing => {
                let admin = config.with_database(ADMIN_DATABASE);
                let report = self.run_session(&admin, &config.database).await?;
                if config.database != admin.database {
                    self.verify_login(config).await?;
                }
                Ok(report)
            }
        }
    }

    /// Log in with `login` and run the steps against `database`.
    async fn run_session(&self, login: &ConnectionConfig, database: &str) -> Result<ProbeReport> {
        let mut session = self.connector.connect(login).await?;

        let outcome = self.run_steps(&mut session, database).await;
        let closed = session.close().await;

        match (outcome, closed) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(close_err)) => {
                tracing::warn!(error = %close_err, "failed to close session after error");
                Err(e)
            }
        }
    }

    async fn verify_login(&self, config: &ConnectionConfig) -> Result<()> {
        let session = self.connector.connect(config).await?;
        tracing::debug!(database = %config.database, "target database accepts logins");
        session.close().await
    }

    async fn run_steps(&self, session: &mut C::Session, database: &str) -> Result<ProbeReport> {
        let server_version = session.server_version().await?;
        tracing::info!(
            version = truncate_chars(&server_version, VERSION_PREVIEW_CHARS),
            "server version"
        );

        let database_existed = session.database_exists(database).await?;
        let create_issued = match self.database_step {
            DatabaseStep::AlwaysCreate => true,
            DatabaseStep::CreateIfMissing => !database_existed,
        };

        if create_issued {
            tracing::debug!(database, database_existed, "creating database");
            session.create_database(database).await?;
        }

        Ok(ProbeReport {
            server_version,
            database: database.to_string(),
            database_existed,
            create_issued,
        })
    }
}

/// Truncate to at most `max` characters without splitting a code point.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
