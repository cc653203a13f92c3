//! Configuration management for the exporter.
//!
//! Every setting can come from four places. For each key independently the
//! first one that has a value wins:
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`EXPORT_*`, a `.env` file is loaded at startup)
//! 3. Configuration file (`--config` / `EXPORT_CONFIG`)
//! 4. Default value (lowest priority)
//!
//! `username` and `password` have no default and must be set somewhere.
//!
//! # Example Configuration File
//!
//! ```toml
//! interval = 300
//! output = "metrics/ext_domain_metrics.prom"
//! username = "reseller"
//! password = "secret"
//! endpoint = "https://soap.domain-bestellsystem.de/soap.php"
//! timeout = 30
//! ```

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::soap::DEFAULT_ENDPOINT;

pub const DEFAULT_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_OUTPUT: &str = "metrics/ext_domain_metrics.prom";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_CONFIG: &str = "EXPORT_CONFIG";
pub const ENV_INTERVAL: &str = "EXPORT_INTERVAL";
pub const ENV_OUTPUT: &str = "EXPORT_OUTPUT";
pub const ENV_USER: &str = "EXPORT_USER";
pub const ENV_PASS: &str = "EXPORT_PASS";
pub const ENV_ENDPOINT: &str = "EXPORT_ENDPOINT";
pub const ENV_TIMEOUT: &str = "EXPORT_TIMEOUT";
pub const ENV_DOMAIN_REQUEST: &str = "EXPORT_DOMAIN_REQUEST";
pub const ENV_SSL_REQUEST: &str = "EXPORT_SSL_REQUEST";
pub const ENV_LOG_LEVEL: &str = "EXPORT_LOG_LEVEL";

/// One layer of configuration, from the command line or a TOML file.
///
/// All fields are optional; resolution fills the gaps from the layers below.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Seconds between two polls
    pub interval: Option<u64>,
    /// Metrics file to (over)write
    pub output: Option<PathBuf>,
    /// SOAP API user
    pub username: Option<String>,
    /// SOAP API password
    pub password: Option<String>,
    /// SOAP endpoint
    pub endpoint: Option<Url>,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
    /// File replacing the built-in domain listing request
    pub domain_request: Option<PathBuf>,
    /// File replacing the built-in SSL listing request
    pub ssl_request: Option<PathBuf>,
}

impl Config {
    /// Loads a configuration layer from a TOML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully parsed configuration
    /// * `Err(ConfigError::Io)` - File could not be read
    /// * `Err(ConfigError::Parse)` - File contains invalid TOML or unknown keys
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        let example = Config {
            interval: Some(DEFAULT_INTERVAL_SECS),
            output: Some(PathBuf::from(DEFAULT_OUTPUT)),
            username: Some("reseller".to_string()),
            password: Some("change-me".to_string()),
            endpoint: Url::parse(DEFAULT_ENDPOINT).ok(),
            timeout: Some(DEFAULT_TIMEOUT_SECS),
            domain_request: None,
            ssl_request: None,
        };

        toml::to_string_pretty(&example)
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

/// Where a resolved setting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConfigSource {
    Argument,
    Env,
    File,
    Default,
}

/// A setting together with the layer that provided it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ConfigSource,
}

/// Resolves settings across argument, environment, file and default layers.
///
/// The environment is read through a lookup function so tests never touch
/// the process environment.
pub struct Resolver<F> {
    env: F,
}

impl Resolver<fn(&str) -> Option<String>> {
    /// Resolver backed by the process environment.
    pub fn from_env() -> Self {
        fn lookup(key: &str) -> Option<String> {
            std::env::var(key).ok()
        }
        Resolver { env: lookup }
    }
}

impl<F> Resolver<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(env: F) -> Self {
        Resolver { env }
    }

    /// Returns the highest-priority value for a key, if any layer has one.
    ///
    /// Environment values are parsed into `T`; a value that does not parse is
    /// an error rather than a fallthrough to the next layer.
    pub fn resolve<T>(
        &self,
        env_var: &str,
        cli: Option<T>,
        file: Option<T>,
    ) -> Result<Option<Resolved<T>>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        if let Some(value) = cli {
            return Ok(Some(Resolved {
                value,
                source: ConfigSource::Argument,
            }));
        }
        if let Some(raw) = (self.env)(env_var) {
            let value = raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key: env_var.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            return Ok(Some(Resolved {
                value,
                source: ConfigSource::Env,
            }));
        }
        Ok(file.map(|value| Resolved {
            value,
            source: ConfigSource::File,
        }))
    }

    pub fn with_default<T>(
        &self,
        env_var: &str,
        cli: Option<T>,
        file: Option<T>,
        default: T,
    ) -> Result<Resolved<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.resolve(env_var, cli, file)?.unwrap_or(Resolved {
            value: default,
            source: ConfigSource::Default,
        }))
    }

    /// Resolves a mandatory string setting. Empty counts as missing.
    pub fn required(
        &self,
        env_var: &str,
        cli: Option<String>,
        file: Option<String>,
    ) -> Result<Resolved<String>, ConfigError> {
        self.resolve(env_var, cli, file)?
            .filter(|r| !r.value.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                key: env_var.to_string(),
            })
    }
}

/// Fully resolved exporter settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub interval: Resolved<u64>,
    pub output: Resolved<PathBuf>,
    pub username: Resolved<String>,
    pub password: Resolved<String>,
    pub endpoint: Resolved<Url>,
    pub timeout: Resolved<u64>,
    pub domain_request: Option<Resolved<PathBuf>>,
    pub ssl_request: Option<Resolved<PathBuf>>,
}

impl Settings {
    /// Resolves every setting from the command-line and file layers plus the
    /// resolver's environment.
    pub fn resolve<F>(resolver: &Resolver<F>, cli: Config, file: Config) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_endpoint = Url::parse(DEFAULT_ENDPOINT).map_err(|e| ConfigError::Invalid {
            key: ENV_ENDPOINT.to_string(),
            value: DEFAULT_ENDPOINT.to_string(),
            reason: e.to_string(),
        })?;

        let settings = Settings {
            interval: resolver.with_default(
                ENV_INTERVAL,
                cli.interval,
                file.interval,
                DEFAULT_INTERVAL_SECS,
            )?,
            output: resolver.with_default(
                ENV_OUTPUT,
                cli.output,
                file.output,
                PathBuf::from(DEFAULT_OUTPUT),
            )?,
            username: resolver.required(ENV_USER, cli.username, file.username)?,
            password: resolver.required(ENV_PASS, cli.password, file.password)?,
            endpoint: resolver.with_default(
                ENV_ENDPOINT,
                cli.endpoint,
                file.endpoint,
                default_endpoint,
            )?,
            timeout: resolver.with_default(
                ENV_TIMEOUT,
                cli.timeout,
                file.timeout,
                DEFAULT_TIMEOUT_SECS,
            )?,
            domain_request: resolver.resolve(
                ENV_DOMAIN_REQUEST,
                cli.domain_request,
                file.domain_request,
            )?,
            ssl_request: resolver.resolve(ENV_SSL_REQUEST, cli.ssl_request, file.ssl_request)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.value == 0 {
            return Err(ConfigError::Validation(
                "interval must be at least 1 second".to_string(),
            ));
        }
        if self.timeout.value == 0 {
            return Err(ConfigError::Validation(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        if !matches!(self.endpoint.value.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "endpoint must be an http(s) URL, got {}",
                self.endpoint.value
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval.value)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.value)
    }

    /// Logs every setting with its source. The password is masked.
    pub fn log_summary(&self) {
        info!("Configuration used:");
        info!(
            "  Interval: {}s (source: {})",
            self.interval.value, self.interval.source
        );
        info!(
            "  Output: {} (source: {})",
            self.output.value.display(),
            self.output.source
        );
        info!(
            "  Username: {} (source: {})",
            self.username.value, self.username.source
        );
        info!(
            "  Password: {} (source: {})",
            "*".repeat(self.password.value.chars().count()),
            self.password.source
        );
        info!(
            "  Endpoint: {} (source: {})",
            self.endpoint.value, self.endpoint.source
        );
        info!(
            "  Timeout: {}s (source: {})",
            self.timeout.value, self.timeout.source
        );
        for (name, request) in [
            ("Domain request", &self.domain_request),
            ("SSL request", &self.ssl_request),
        ] {
            match request {
                Some(r) => info!("  {}: {} (source: {})", name, r.value.display(), r.source),
                None => info!("  {}: built-in", name),
            }
        }
    }
}

/// Errors that can occur during configuration loading and resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("IO Error: {0}")]
    Io(String),
    /// TOML parsing error (invalid syntax, type mismatch, unknown key)
    #[error("Parse Error: {0}")]
    Parse(String),
    /// A mandatory setting is not set in any layer
    #[error("Missing required config value: {key}")]
    Missing { key: String },
    /// A value could not be converted to the setting's type
    #[error("Could not convert value '{value}' for '{key}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
    /// Validation error (out of range values, etc.)
    #[error("Validation Error: {0}")]
    Validation(String),
}
