//! Probe configuration resolved from the process environment.
//!
//! Configuration is read exactly once, at the entry point, into an
//! [`EnvSnapshot`]. [`ConnectionConfig::resolve`] is a pure function of that
//! snapshot, so tests never need to mutate the real process environment.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;

use mssql_client::{Config, Credentials, RetryPolicy};

use crate::error::{ProbeError, Result};

/// Server hostname or IP address.
pub const SERVER_ENV: &str = "MSSQL_SERVER";
/// Server TCP port.
pub const PORT_ENV: &str = "MSSQL_PORT";
/// SQL authentication login.
pub const USER_ENV: &str = "MSSQL_USER";
/// SQL authentication password.
pub const PASSWORD_ENV: &str = "MSSQL_PASSWORD";
/// Target database, checked and created by the probe.
pub const DATABASE_ENV: &str = "MSSQL_DATABASE";
/// TLS encryption mode: `false`/`no`/`0`, `true`/`yes`/`1`, or `strict`.
pub const ENCRYPT_ENV: &str = "MSSQL_ENCRYPT";
/// Whether to accept the server certificate without validation.
pub const TRUST_CERT_ENV: &str = "MSSQL_TRUST_SERVER_CERTIFICATE";

/// Default server host.
pub const DEFAULT_SERVER: &str = "localhost";
/// Default port. The local container setup maps SQL Server to 1434.
pub const DEFAULT_PORT: u16 = 1434;
/// Default login.
pub const DEFAULT_USER: &str = "sa";
/// Placeholder password for local, throwaway servers only.
pub const DEFAULT_PASSWORD: &str = "TuPassword123!";
/// Default database.
pub const DEFAULT_DATABASE: &str = "master";
/// Database that always accepts logins; used to create a missing target.
pub const ADMIN_DATABASE: &str = "master";

/// Application name reported to the server (visible in `sys.dm_exec_sessions`).
const APPLICATION_NAME: &str = "mssql-probe";

/// An immutable copy of the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment.
    ///
    /// Variables whose name or value is not valid Unicode are skipped with a
    /// warning, so the affected setting falls back to its default.
    #[must_use]
    pub fn capture() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    fn from_os_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        vars.into_iter()
            .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (Ok(key), Err(_)) => {
                    tracing::warn!(
                        name = %key,
                        "skipping environment variable: value is not UTF-8"
                    );
                    None
                }
                (Err(key), _) => {
                    tracing::warn!(
                        name = ?key,
                        "skipping environment variable: name is not UTF-8"
                    );
                    None
                }
            })
            .collect()
    }

    /// Look up a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// TLS encryption mode requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptMode {
    /// Encrypt only if the server requires it.
    #[default]
    Off,
    /// Always encrypt (TDS 7.x pre-login negotiation).
    On,
    /// TDS 8.0 strict mode: TLS before any TDS traffic.
    Strict,
}

/// Connection parameters for one probe attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Server hostname or IP address.
    pub server: String,
    /// Server TCP port.
    pub port: u16,
    /// SQL authentication login.
    pub user: String,
    /// SQL authentication password.
    pub password: String,
    /// Target database.
    pub database: String,
    /// TLS encryption mode.
    pub encrypt: EncryptMode,
    /// Skip server certificate validation.
    pub trust_server_certificate: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT,
            user: DEFAULT_USER.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            encrypt: EncryptMode::Off,
            trust_server_certificate: true,
        }
    }
}

impl ConnectionConfig {
    /// Resolve the configuration from an environment snapshot.
    ///
    /// Unset variables fall back to their defaults; a variable set to the
    /// empty string is used as-is. Only `MSSQL_PORT` and the two TLS flags
    /// are parsed, and a parse failure is returned before anything touches
    /// the network.
    pub fn resolve(env: &EnvSnapshot) -> Result<Self> {
        let port = match env.get(PORT_ENV) {
            None => DEFAULT_PORT,
            Some(raw) => raw.parse::<u16>().map_err(|source| ProbeError::InvalidPort {
                value: raw.to_string(),
                source,
            })?,
        };

        let encrypt = match env.get(ENCRYPT_ENV) {
            None => EncryptMode::Off,
            Some(value) if value.eq_ignore_ascii_case("strict") => EncryptMode::Strict,
            Some(value) => {
                if parse_flag(ENCRYPT_ENV, value)? {
                    EncryptMode::On
                } else {
                    EncryptMode::Off
                }
            }
        };

        let trust_server_certificate = match env.get(TRUST_CERT_ENV) {
            None => true,
            Some(value) => parse_flag(TRUST_CERT_ENV, value)?,
        };

        Ok(Self {
            server: env.get_or(SERVER_ENV, DEFAULT_SERVER).to_string(),
            port,
            user: env.get_or(USER_ENV, DEFAULT_USER).to_string(),
            password: env.get_or(PASSWORD_ENV, DEFAULT_PASSWORD).to_string(),
            database: env.get_or(DATABASE_ENV, DEFAULT_DATABASE).to_string(),
            encrypt,
            trust_server_certificate,
        })
    }

    /// Build the driver configuration for a single connection attempt.
    ///
    /// Driver-level retries are disabled: the probe makes exactly one attempt.
    #[must_use]
    pub fn to_client_config(&self) -> Config {
        let config = Config::new()
            .host(self.server.clone())
            .port(self.port)
            .database(self.database.clone())
            .credentials(Credentials::sql_server(
                self.user.clone(),
                self.password.clone(),
            ))
            .application_name(APPLICATION_NAME)
            .trust_server_certificate(self.trust_server_certificate)
            .retry(RetryPolicy::no_retry());

        match self.encrypt {
            EncryptMode::Off => config.encrypt(false),
            EncryptMode::On => config.encrypt(true),
            EncryptMode::Strict => config.encrypt(true).strict_mode(true),
        }
    }

    /// The same settings with a different login database.
    #[must_use]
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..self.clone()
        }
    }

    /// `host:port` as shown in status lines.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("encrypt", &self.encrypt)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .finish()
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool> {
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") || value == "1" {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") || value.eq_ignore_ascii_case("no") || value == "0"
    {
        Ok(false)
    } else {
        Err(ProbeError::InvalidFlag {
            name,
            value: value.to_string(),
        })
    }
}
