//! Service configuration read from the process environment at startup.
//!
//! PAC endpoint settings (`PAC_DEMO_URL`, `PAC_PRODUCTION_URL`,
//! `PAC_TIMEOUT_SECS`) belong to [`pacgate_pac_client::PacApiConfig`] and are
//! loaded there.

use std::path::PathBuf;
use std::str::FromStr;

use pacgate_core::Environment;

use crate::auth::SecretToken;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Log output format, selected by `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Static bearer token for the admin routes. `None` leaves them open.
    pub admin_token: Option<SecretToken>,
    /// Environment used when a submit request does not name one.
    pub default_environment: Environment,
    /// PostgreSQL URL. `None` selects the in-memory store.
    pub database_url: Option<SecretToken>,
    pub db_max_connections: u32,
    /// JSON array of companies inserted at boot.
    pub companies_seed_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[REDACTED]"))
            .field("default_environment", &self.default_environment)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("companies_seed_file", &self.companies_seed_file)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            admin_token: None,
            default_environment: Environment::Demo,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            companies_seed_file: None,
            log_format: LogFormat::Plain,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl AppConfig {
    /// Read `PORT`, `ADMIN_TOKEN`, `PAC_DEFAULT_ENVIRONMENT`, `DATABASE_URL`,
    /// `DB_MAX_CONNECTIONS`, `COMPANIES_SEED_FILE` and `LOG_FORMAT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => parse_var("PORT", &raw)?,
            None => defaults.port,
        };

        let default_environment = match get("PAC_DEFAULT_ENVIRONMENT") {
            Some(raw) => Environment::from_str(&raw).map_err(|e| ConfigError::Invalid {
                var: "PAC_DEFAULT_ENVIRONMENT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.default_environment,
        };

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(raw) => match parse_var::<u32>("DB_MAX_CONNECTIONS", &raw)? {
                0 => {
                    return Err(ConfigError::Invalid {
                        var: "DB_MAX_CONNECTIONS",
                        value: raw,
                        reason: "must be at least 1".into(),
                    })
                }
                n => n,
            },
            None => defaults.db_max_connections,
        };

        let log_format = match get("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("plain") | Some("text") => LogFormat::Plain,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected plain or json".into(),
                })
            }
        };

        Ok(Self {
            port,
            admin_token: get("ADMIN_TOKEN").map(SecretToken::new),
            default_environment,
            database_url: get("DATABASE_URL").map(SecretToken::new),
            db_max_connections,
            companies_seed_file: get("COMPANIES_SEED_FILE").map(PathBuf::from),
            log_format,
        })
    }
}

fn parse_var<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
