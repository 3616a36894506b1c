//! In-memory fakes for the driver and the command runner.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mssql_probe::{
    CommandRunner, ConnectionConfig, Connector, DriverLoader, ProbeError, Result, Session,
    ShellCommand,
};

pub const SQL_SERVER_2022: &str = "Microsoft SQL Server 2022 (RTM-CU14) (KB5038325) - 16.0.4135.4 (X64) \
     Jul 10 2024 14:09:09 Copyright (C) 2022 Microsoft Corporation Developer Edition (64-bit) \
     on Linux (Ubuntu 22.04.4 LTS) <X64>";

/// Which session call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Connect,
    Version,
    ExistsCheck,
    Create,
    Close,
}

/// Shared call log and catalog plus the scripted server behaviour.
///
/// Like SQL Server, the fake refuses a login to a database that is not in
/// its catalog, and a successful create adds the database to it.
#[derive(Debug, Clone)]
pub struct FakeServer {
    pub calls: Rc<RefCell<Vec<String>>>,
    pub version: String,
    pub existing: Rc<RefCell<Vec<String>>>,
    pub fail_at: Option<FailAt>,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self {
            calls: Rc::default(),
            version: SQL_SERVER_2022.to_string(),
            existing: Rc::new(RefCell::new(vec![
                "master".into(),
                "tempdb".into(),
                "model".into(),
                "msdb".into(),
            ])),
            fail_at: None,
        }
    }
}

impl FakeServer {
    pub fn failing_at(fail_at: FailAt) -> Self {
        Self {
            fail_at: Some(fail_at),
            ..Self::default()
        }
    }

    /// Add a database to the catalog.
    pub fn with_database(self, name: &str) -> Self {
        self.existing.borrow_mut().push(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.existing.borrow().iter().any(|db| db == name)
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }

    fn check(&self, at: FailAt) -> Result<()> {
        if self.fail_at == Some(at) {
            Err(ProbeError::connection(format!("simulated failure at {at:?}")))
        } else {
            Ok(())
        }
    }
}

impl Connector for FakeServer {
    type Session = FakeSession;

    async fn connect(&self, config: &ConnectionConfig) -> Result<FakeSession> {
        self.record(format!("connect {}/{}", config.address(), config.database));
        self.check(FailAt::Connect)?;
        if !self.has_database(&config.database) {
            return Err(ProbeError::connection(format!(
                "Cannot open database \"{}\" requested by the login. The login failed.",
                config.database
            )));
        }
        Ok(FakeSession {
            server: self.clone(),
        })
    }
}

pub struct FakeSession {
    server: FakeServer,
}

impl Session for FakeSession {
    async fn server_version(&mut self) -> Result<String> {
        self.server.record("version");
        self.server.check(FailAt::Version)?;
        Ok(self.server.version.clone())
    }

    async fn database_exists(&mut self, name: &str) -> Result<bool> {
        self.server.record(format!("exists {name}"));
        self.server.check(FailAt::ExistsCheck)?;
        Ok(self.server.has_database(name))
    }

    async fn create_database(&mut self, name: &str) -> Result<()> {
        self.server.record(format!("create {name}"));
        self.server.check(FailAt::Create)?;
        if self.server.has_database(name) {
            return Err(ProbeError::connection(format!(
                "Database '{name}' already exists. Choose a different database name."
            )));
        }
        self.server.existing.borrow_mut().push(name.to_string());
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.server.record("close");
        self.server.check(FailAt::Close)
    }
}

/// Loader that fails until `available_after` load attempts have been made.
#[derive(Debug, Clone)]
pub struct FakeLoader {
    pub server: FakeServer,
    pub available_after: usize,
    pub attempts: Rc<Cell<usize>>,
}

impl FakeLoader {
    pub fn available(server: FakeServer) -> Self {
        Self {
            server,
            available_after: 0,
            attempts: Rc::default(),
        }
    }

    pub fn missing_until(server: FakeServer, available_after: usize) -> Self {
        Self {
            server,
            available_after,
            attempts: Rc::default(),
        }
    }
}

impl DriverLoader for FakeLoader {
    type Connector = FakeServer;

    fn load(&self) -> Result<FakeServer> {
        let attempt = self.attempts.get();
        self.attempts.set(attempt + 1);
        if attempt < self.available_after {
            Err(ProbeError::DriverUnavailable("driver not installed".into()))
        } else {
            Ok(self.server.clone())
        }
    }
}

/// Records commands; fails the ones whose program or display matches.
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    pub commands: Rc<RefCell<Vec<String>>>,
    pub missing_programs: Vec<String>,
    pub failing_commands: Vec<String>,
}

impl FakeRunner {
    pub fn without(program: &str) -> Self {
        Self {
            missing_programs: vec![program.to_string()],
            ..Self::default()
        }
    }

    pub fn failing(command: &str) -> Self {
        Self {
            failing_commands: vec![command.to_string()],
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }

    fn exec(&self, command: &ShellCommand) -> std::result::Result<(), String> {
        let line = command.to_string();
        self.commands.borrow_mut().push(line.clone());
        if self.missing_programs.contains(&command.program) {
            return Err(format!("command not found: {}", command.program));
        }
        if self.failing_commands.contains(&line) {
            return Err("exit status: 1".to_string());
        }
        Ok(())
    }
}

impl CommandRunner for FakeRunner {
    fn read(&self, command: &ShellCommand) -> std::result::Result<String, String> {
        self.exec(command).map(|()| format!("{} 4.3.0", command.program))
    }

    fn run(&self, command: &ShellCommand) -> std::result::Result<(), String> {
        self.exec(command)
    }
}
