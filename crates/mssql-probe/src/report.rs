//! Human-readable console output.
//!
//! Everything the user reads goes through [`Reporter`]; diagnostics go to
//! `tracing` instead. None of this output is meant to be parsed.

use std::io::{self, Write};

use crate::config::ConnectionConfig;
use crate::error::ProbeError;
use crate::probe::ProbeReport;

/// Printed after any connection failure.
pub const TROUBLESHOOTING_HINTS: [&str; 4] = [
    "Check that the SQL Server container is running: docker ps",
    "Check the server logs: docker-compose logs mssql",
    "Check the password in the .env file",
    "Review the configuration and try again",
];

/// Writes probe progress to a terminal or any other sink.
#[derive(Debug)]
pub struct Reporter<W> {
    out: W,
}

impl<W: Write> Reporter<W> {
    /// Create a reporter writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the reporter and return the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Title line.
    pub fn banner(&mut self) -> io::Result<()> {
        writeln!(self.out, "🧪 SQL Server connection probe")?;
        writeln!(self.out, "{}", "=".repeat(40))
    }

    /// The driver loaded.
    pub fn driver_ready(&mut self) -> io::Result<()> {
        writeln!(self.out, "✅ SQL Server driver available")
    }

    /// The driver did not load; a bootstrap follows.
    pub fn driver_missing(&mut self, err: &ProbeError) -> io::Result<()> {
        writeln!(self.out, "📦 SQL Server driver not available ({err}), installing...")
    }

    /// The bootstrap finished.
    pub fn bootstrap_succeeded(&mut self) -> io::Result<()> {
        writeln!(self.out, "✅ Driver dependencies installed")
    }

    /// The bootstrap, or the load after it, failed.
    pub fn bootstrap_failed(&mut self, err: &ProbeError) -> io::Result<()> {
        writeln!(self.out, "❌ Could not install driver dependencies: {err}")
    }

    /// Configuration could not be resolved.
    pub fn config_failed(&mut self, err: &ProbeError) -> io::Result<()> {
        writeln!(self.out, "❌ Invalid configuration: {err}")
    }

    /// About to connect. The password is never printed.
    pub fn connecting(&mut self, config: &ConnectionConfig) -> io::Result<()> {
        writeln!(self.out, "🔗 Connecting to {}", config.address())?;
        writeln!(self.out, "👤 User: {}", config.user)?;
        writeln!(self.out, "🗄️  Database: {}", config.database)
    }

    /// The probe succeeded.
    pub fn probe_succeeded(&mut self, report: &ProbeReport) -> io::Result<()> {
        writeln!(self.out, "✅ Connection successful!")?;
        writeln!(self.out, "📊 SQL Server version: {}...", report.version_preview())?;
        writeln!(self.out, "🗄️  Database '{}' verified/created", report.database)
    }

    /// The probe failed: the error, then the fixed hints.
    pub fn probe_failed(&mut self, err: &ProbeError) -> io::Result<()> {
        writeln!(self.out, "❌ Connection error: {err}")?;
        writeln!(self.out)?;
        writeln!(self.out, "🔧 Possible fixes:")?;
        for (i, hint) in TROUBLESHOOTING_HINTS.iter().enumerate() {
            writeln!(self.out, "{}. {hint}", i + 1)?;
        }
        Ok(())
    }

    /// Closing line on success.
    pub fn all_good(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "🎉 Everything is configured correctly!")
    }

    /// Closing line on failure.
    pub fn check_configuration(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "🔧 Check the configuration and try again")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn output(f: impl FnOnce(&mut Reporter<Vec<u8>>) -> io::Result<()>) -> String {
        let mut reporter = Reporter::new(Vec::new());
        f(&mut reporter).unwrap();
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_failure_lists_all_hints_in_order() {
        let text = output(|r| r.probe_failed(&ProbeError::connection("Login failed")));

        assert!(text.contains("Connection error: Login failed"));
        for (i, hint) in TROUBLESHOOTING_HINTS.iter().enumerate() {
            assert!(text.contains(&format!("{}. {hint}", i + 1)));
        }
        assert!(text.find("1. ").unwrap() < text.find("4. ").unwrap());
    }

    #[test]
    fn test_connecting_hides_password() {
        let config = ConnectionConfig {
            password: "hunter2".into(),
            ..ConnectionConfig::default()
        };
        let text = output(|r| r.connecting(&config));

        assert!(text.contains("localhost:1434"));
        assert!(text.contains("User: sa"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn test_success_shows_version_preview() {
        let report = ProbeReport {
            server_version: format!("Microsoft SQL Server 2022 {}", "x".repeat(100)),
            database: "appdb".into(),
            database_existed: false,
            create_issued: true,
        };
        let text = output(|r| r.probe_succeeded(&report));

        assert!(text.contains(&format!("version: {}...", report.version_preview())));
        assert!(!text.contains(&"x".repeat(51)));
        assert!(text.contains("'appdb'"));
    }
}
