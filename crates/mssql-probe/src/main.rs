//! `mssql-probe` binary.
//!
//! ```bash
//! export MSSQL_SERVER=localhost
//! export MSSQL_PORT=1434
//! export MSSQL_PASSWORD='YourStrong@Passw0rd'
//!
//! mssql-probe            # exit code 0 on success, 1 on failure
//! mssql-probe -vv        # with debug logs on stderr
//! ```

use std::io;
use std::process::ExitCode;

use clap::Parser;
use mssql_probe::{App, BuiltinDriver, DatabaseStep, EnvSnapshot, Outcome, Reporter, ShellRunner};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "mssql-probe",
    version,
    about = "Check that a SQL Server instance is reachable and usable",
    long_about = "Connects with the MSSQL_SERVER, MSSQL_PORT, MSSQL_USER, MSSQL_PASSWORD and \
                  MSSQL_DATABASE environment variables, prints the server version and creates \
                  the target database."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only create the database when the catalog lookup does not find it
    #[arg(long)]
    create_if_missing: bool,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let env = EnvSnapshot::capture();
    let step = if cli.create_if_missing {
        DatabaseStep::CreateIfMissing
    } else {
        DatabaseStep::AlwaysCreate
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return Outcome::Failure.into();
        }
    };

    let app = App::new(BuiltinDriver, ShellRunner).database_step(step);
    let mut reporter = Reporter::new(io::stdout().lock());

    match runtime.block_on(app.run(&env, &mut reporter)) {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            tracing::error!(error = %e, "failed to write report");
            Outcome::Failure.into()
        }
    }
}
