//! Driver bootstrap through the platform package manager.
//!
//! Installs the native connectivity library with Homebrew, then reinstalls
//! the probe with cargo so the driver is built against it. Commands run
//! through a [`CommandRunner`]; [`ShellRunner`] uses `xshell`.
//!
//! The bootstrap only runs with a [`DriverLoader`](crate::DriverLoader) that
//! can fail to load; [`BuiltinDriver`](crate::BuiltinDriver) always loads, so
//! the shipped binary never reaches it.

use std::fmt;

use thiserror::Error;
use xshell::Shell;

/// Errors raised while installing the driver.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BootstrapError {
    /// The platform package manager is not installed.
    #[error("{program} is not installed. Install it from {install_url}")]
    PackageManagerMissing {
        /// Package manager executable.
        program: String,
        /// Where to get it.
        install_url: String,
    },

    /// An install command failed.
    #[error("`{command}` failed: {message}")]
    InstallFailed {
        /// The command line that failed.
        command: String,
        /// Error output or exit status.
        message: String,
    },
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    /// Executable name, resolved through `PATH`.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
}

impl ShellCommand {
    /// Build a command from a program and arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Executes external commands for the bootstrap.
pub trait CommandRunner {
    /// Run with output captured. Used for presence checks.
    fn read(&self, command: &ShellCommand) -> Result<String, String>;

    /// Run with output shown to the user.
    fn run(&self, command: &ShellCommand) -> Result<(), String>;
}

/// [`CommandRunner`] backed by an `xshell` [`Shell`] in the current directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn read(&self, command: &ShellCommand) -> Result<String, String> {
        let sh = Shell::new().map_err(|e| e.to_string())?;
        sh.cmd(&command.program)
            .args(&command.args)
            .quiet()
            .ignore_stderr()
            .read()
            .map_err(|e| e.to_string())
    }

    fn run(&self, command: &ShellCommand) -> Result<(), String> {
        let sh = Shell::new().map_err(|e| e.to_string())?;
        sh.cmd(&command.program)
            .args(&command.args)
            .run()
            .map_err(|e| e.to_string())
    }
}

/// The install plan: presence check, native library, driver package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverBootstrap {
    /// Package manager executable.
    pub package_manager: String,
    /// Shown when the package manager is missing.
    pub package_manager_url: String,
    /// Native library installed with the package manager.
    pub native_library: String,
    /// Command that installs the driver package.
    pub driver_install: ShellCommand,
}

impl Default for DriverBootstrap {
    fn default() -> Self {
        Self {
            package_manager: "brew".to_string(),
            package_manager_url: "https://brew.sh".to_string(),
            native_library: "freetds".to_string(),
            driver_install: ShellCommand::new(
                "cargo",
                ["install", "--locked", env!("CARGO_PKG_NAME")],
            ),
        }
    }
}

impl DriverBootstrap {
    /// `<package manager> --version`.
    #[must_use]
    pub fn presence_check(&self) -> ShellCommand {
        ShellCommand::new(&*self.package_manager, ["--version"])
    }

    /// `<package manager> install <native library>`.
    #[must_use]
    pub fn native_install(&self) -> ShellCommand {
        ShellCommand::new(&*self.package_manager, ["install", self.native_library.as_str()])
    }

    /// Make sure the driver and its native library are installed.
    ///
    /// Nothing is installed if the package manager is missing. The driver
    /// package is only installed after the native library succeeded.
    pub fn ensure_driver_available(&self, runner: &impl CommandRunner) -> Result<(), BootstrapError> {
        let check = self.presence_check();
        if let Err(message) = runner.read(&check) {
            tracing::debug!(command = %check, error = %message, "package manager not found");
            return Err(BootstrapError::PackageManagerMissing {
                program: self.package_manager.clone(),
                install_url: self.package_manager_url.clone(),
            });
        }

        for command in [self.native_install(), self.driver_install.clone()] {
            tracing::info!(command = %command, "installing");
            runner
                .run(&command)
                .map_err(|message| BootstrapError::InstallFailed {
                    command: command.to_string(),
                    message,
                })?;
        }

        Ok(())
    }
}
