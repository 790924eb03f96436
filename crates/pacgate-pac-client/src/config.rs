//! PAC client configuration.
//!
//! One base URL per [`Environment`]. Defaults point at the public demo and
//! production hosts; override via environment variables or explicit
//! construction for staging and tests.

use pacgate_core::Environment;
use url::Url;

/// Default base URL of the PAC demo environment.
pub const DEFAULT_DEMO_URL: &str = "https://demoemision.thefactoryhka.com.pa";
/// Default base URL of the PAC production environment.
pub const DEFAULT_PRODUCTION_URL: &str = "https://emision.thefactoryhka.com.pa";
/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the PAC REST API.
///
/// Holds no secrets: PAC credentials are per company and travel with each
/// call as [`PacCredentials`](crate::PacCredentials).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacApiConfig {
    pub demo_url: Url,
    pub production_url: Url,
    /// Per-request timeout in seconds. Applies to every call.
    pub timeout_secs: u64,
}

impl PacApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PAC_DEMO_URL` (default: [`DEFAULT_DEMO_URL`])
    /// - `PAC_PRODUCTION_URL` (default: [`DEFAULT_PRODUCTION_URL`])
    /// - `PAC_TIMEOUT_SECS` (default: 30, must be a positive integer)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            demo_url: env_url("PAC_DEMO_URL", DEFAULT_DEMO_URL)?,
            production_url: env_url("PAC_PRODUCTION_URL", DEFAULT_PRODUCTION_URL)?,
            timeout_secs: env_timeout("PAC_TIMEOUT_SECS")?,
        })
    }

    /// Point both environments at one local mock server.
    pub fn local_mock(base_url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl("local_mock".to_string(), e.to_string()))?;
        Ok(Self {
            demo_url: url.clone(),
            production_url: url,
            timeout_secs: 5,
        })
    }

    pub fn base_url(&self, env: Environment) -> &Url {
        match env {
            Environment::Demo => &self.demo_url,
            Environment::Production => &self.production_url,
        }
    }

    /// Join `path` onto the base URL for `env`.
    ///
    /// Base URLs may or may not carry a trailing slash or a path prefix; the
    /// result always keeps the prefix.
    pub fn endpoint_url(&self, env: Environment, path: &str) -> String {
        let base = self.base_url(env).as_str().trim_end_matches('/');
        format!("{base}/{}", path.trim_start_matches('/'))
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_timeout(var: &str) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Err(_) => Ok(DEFAULT_TIMEOUT_SECS),
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(ConfigError::InvalidTimeout(var.to_string(), raw)),
        },
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid timeout for {0}: {1:?} (expected a positive number of seconds)")]
    InvalidTimeout(String, String),
}
