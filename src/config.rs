//! Configuration loading from environment.

use std::{env, fmt, str::FromStr};

use log::warn;

pub const DEFAULT_API_URL: &str = "https://currencyapi.net/api/v1/rates";
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Database connection settings. Missing values are reported when a
/// connection is attempted, not here.
#[derive(Clone, Default)]
pub struct DbConfig {
    pub host: Option<String>,
    pub port: u16,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// How the process drives the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    RunOnce,
    Schedule,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "run_once" => Ok(RunMode::RunOnce),
            "schedule" => Ok(RunMode::Schedule),
            other => Err(format!(
                "Invalid SCRIPT_MODE: {other}. Set to 'run_once' or 'schedule'."
            )),
        }
    }
}

/// Application configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_url: String,
    pub db: DbConfig,
    /// Raw `SCRIPT_MODE`; parsed by the caller so a bad value is a logged
    /// error rather than a startup failure.
    pub mode: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("DB_PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Invalid DB_PORT '{raw}', using {DEFAULT_DB_PORT}");
                DEFAULT_DB_PORT
            }),
            None => DEFAULT_DB_PORT,
        };

        Self {
            api_key: var("CURRENCY_API_KEY"),
            api_url: var("CURRENCY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            db: DbConfig {
                host: var("DB_HOST"),
                port,
                name: var("DB_NAME"),
                user: var("DB_USER"),
                password: var("DB_PASSWORD"),
            },
            mode: var("SCRIPT_MODE").unwrap_or_else(|| "schedule".to_string()),
        }
    }

    pub fn run_mode(&self) -> Result<RunMode, String> {
        self.mode.parse()
    }
}
