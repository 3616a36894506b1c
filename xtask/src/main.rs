//! Build automation tasks for the mssql-probe workspace.
//!
//! Run with `cargo xtask <command>`.
//!
//! ## Available Commands
//!
//! - `ci`: Run all CI checks (format, lint, test)
//! - `fmt`: Check/apply code formatting
//! - `clippy`: Run clippy lints
//! - `test`: Run tests (`--live` adds the SQL Server tests)
//! - `db`: Manage the local SQL Server container used by the live tests
//! - `probe`: Run the probe against the local container
//! - `dist`: Build the release binary

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use xshell::{Shell, cmd};

/// Container name for the local SQL Server.
const DB_CONTAINER: &str = "mssql-probe-db";
/// SQL Server image used for the live tests.
const DB_IMAGE: &str = "mcr.microsoft.com/mssql/server:2022-latest";
/// Host port the container is published on; matches the probe's default.
const DB_HOST_PORT: &str = "1434";
/// SA password; matches the probe's placeholder password.
const DB_PASSWORD: &str = "TuPassword123!";

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for mssql-probe")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all checks (format, lint, test)
    Ci,
    /// Run cargo fmt (--check by default, --fix to apply)
    Fmt {
        /// Apply formatting fixes
        #[arg(long)]
        fix: bool,
    },
    /// Run clippy on all targets
    Clippy {
        /// Apply clippy suggestions
        #[arg(long)]
        fix: bool,
    },
    /// Run tests
    Test {
        /// Also run the ignored tests against the local SQL Server
        #[arg(long)]
        live: bool,
    },
    /// Manage the local SQL Server container
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    /// Run the probe against the local SQL Server container
    Probe,
    /// Build the release binary
    Dist {
        /// Target triple (e.g., aarch64-apple-darwin)
        #[arg(long)]
        target: Option<String>,
        /// Skip running tests before building
        #[arg(long)]
        no_test: bool,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Start the container (port 1434 on the host)
    Up,
    /// Stop and remove the container
    Down,
    /// Show the container logs
    Logs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let sh = Shell::new()?;

    // Change to workspace root
    let workspace_root = workspace_root()?;
    sh.change_dir(&workspace_root);

    match cli.command {
        Command::Ci => {
            println!("Running CI checks...");
            fmt(&sh, false)?;
            clippy(&sh, false)?;
            test(&sh, false)?;
            println!("\n✅ All CI checks passed!");
        }
        Command::Fmt { fix } => fmt(&sh, fix)?,
        Command::Clippy { fix } => clippy(&sh, fix)?,
        Command::Test { live } => test(&sh, live)?,
        Command::Db { action } => match action {
            DbAction::Up => db_up(&sh)?,
            DbAction::Down => db_down(&sh)?,
            DbAction::Logs => cmd!(sh, "docker logs {DB_CONTAINER}").run()?,
        },
        Command::Probe => probe(&sh)?,
        Command::Dist { target, no_test } => dist(&sh, target.as_deref(), no_test)?,
    }

    Ok(())
}

fn workspace_root() -> Result<PathBuf> {
    let output = std::process::Command::new("cargo")
        .args(["locate-project", "--workspace", "--message-format=plain"])
        .output()
        .context("failed to run cargo locate-project")?;

    let path = String::from_utf8(output.stdout)
        .context("invalid UTF-8 in cargo output")?
        .trim()
        .to_string();

    Ok(PathBuf::from(path)
        .parent()
        .context("failed to get workspace root")?
        .to_path_buf())
}

fn fmt(sh: &Shell, fix: bool) -> Result<()> {
    if fix {
        cmd!(sh, "cargo fmt --all").run()?;
        println!("✅ Formatting applied.");
    } else {
        cmd!(sh, "cargo fmt --all -- --check").run()?;
        println!("✅ Formatting check passed.");
    }
    Ok(())
}

fn clippy(sh: &Shell, fix: bool) -> Result<()> {
    if fix {
        cmd!(sh, "cargo clippy --all-targets --fix --allow-dirty").run()?;
        println!("✅ Clippy suggestions applied.");
    } else {
        cmd!(sh, "cargo clippy --all-targets -- -D warnings").run()?;
        println!("✅ Clippy check passed.");
    }
    Ok(())
}

/// Set the probe's connection variables for the local container.
fn with_local_db_env(sh: &Shell) {
    sh.set_var("MSSQL_SERVER", "localhost");
    sh.set_var("MSSQL_PORT", DB_HOST_PORT);
    sh.set_var("MSSQL_USER", "sa");
    sh.set_var("MSSQL_PASSWORD", DB_PASSWORD);
}

fn test(sh: &Shell, live: bool) -> Result<()> {
    println!("Running tests...");
    cmd!(sh, "cargo test --workspace").run()?;

    if live {
        println!("Running live SQL Server tests against localhost:{DB_HOST_PORT}...");
        with_local_db_env(sh);
        cmd!(sh, "cargo test -p mssql-probe --test integration -- --ignored").run()?;
    }

    println!("✅ All tests passed.");
    Ok(())
}

fn db_up(sh: &Shell) -> Result<()> {
    let filter = format!("name={DB_CONTAINER}");
    let running = cmd!(sh, "docker ps --quiet --filter {filter}")
        .quiet()
        .read()
        .context("docker is not available")?;
    if !running.trim().is_empty() {
        println!("✅ {DB_CONTAINER} already running.");
        return Ok(());
    }

    let port_map = format!("{DB_HOST_PORT}:1433");
    let password = format!("MSSQL_SA_PASSWORD={DB_PASSWORD}");
    cmd!(
        sh,
        "docker run --detach --rm --name {DB_CONTAINER} -e ACCEPT_EULA=Y -e {password} -p {port_map} {DB_IMAGE}"
    )
    .secret()
    .run()?;

    println!("✅ {DB_CONTAINER} started on localhost:{DB_HOST_PORT}.");
    println!("   The server needs a few seconds before it accepts logins.");
    Ok(())
}

fn db_down(sh: &Shell) -> Result<()> {
    cmd!(sh, "docker stop {DB_CONTAINER}").run()?;
    println!("✅ {DB_CONTAINER} stopped.");
    Ok(())
}

fn probe(sh: &Shell) -> Result<()> {
    with_local_db_env(sh);
    cmd!(sh, "cargo run -p mssql-probe -- --create-if-missing -v").run()?;
    Ok(())
}

fn dist(sh: &Shell, target: Option<&str>, no_test: bool) -> Result<()> {
    println!("Building release binary...");

    if !no_test {
        test(sh, false)?;
    }

    let dist_dir = sh.current_dir().join("target/dist");
    fs::create_dir_all(&dist_dir)?;

    let release_dir = if let Some(t) = target {
        cmd!(sh, "cargo build --release -p mssql-probe --target {t}").run()?;
        format!("target/{t}/release")
    } else {
        cmd!(sh, "cargo build --release -p mssql-probe").run()?;
        "target/release".to_string()
    };

    let binary = format!("mssql-probe{}", std::env::consts::EXE_SUFFIX);
    sh.copy_file(format!("{release_dir}/{binary}"), &dist_dir)?;

    println!("✅ Distribution artifact: target/dist/{binary}");
    Ok(())
}
