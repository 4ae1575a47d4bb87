//! Command-line and environment configuration.

use crate::error::{ValidatorError, ValidatorResult};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tollgate_telemetry::ReporterConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

/// Validator configuration. Every flag can also be set from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "tollgate-validator", version)]
#[command(about = "Validates the cluster license and reports the outcome")]
#[command(group(
    ArgGroup::new("trusted_key")
        .required(true)
        .args(["public_key", "public_key_file"])
))]
pub struct Config {
    /// Secret holding the license token
    #[arg(long, env = "LICENSE_SECRET_NAME", default_value = "es-license")]
    pub license_secret_name: String,

    /// Namespace of the license secret; also the namespace the license must be bound to
    #[arg(long, env = "LICENSE_SECRET_NAMESPACE", default_value = "default")]
    pub license_secret_namespace: String,

    /// Key inside the secret's data
    #[arg(long, env = "LICENSE_SECRET_KEY", default_value = "license.jwt")]
    pub license_secret_key: String,

    /// Read the token from a mounted file instead of the Kubernetes API
    #[arg(long, env = "LICENSE_FILE")]
    pub license_file: Option<PathBuf>,

    /// Label key selecting licensed nodes
    #[arg(long, env = "NODE_LABEL_KEY", default_value = "es-products.io/licensed")]
    pub node_label_key: String,

    /// Label value selecting licensed nodes
    #[arg(long, env = "NODE_LABEL_VALUE", default_value = "true")]
    pub node_label_value: String,

    /// Trusted RSA public key (PEM)
    #[arg(long, env = "ES_PUBLIC_KEY")]
    pub public_key: Option<String>,

    /// Path to the trusted RSA public key (PEM)
    #[arg(long, env = "ES_PUBLIC_KEY_FILE")]
    pub public_key_file: Option<PathBuf>,

    /// License server base URL for telemetry
    #[arg(long, env = "LICENSE_SERVER_URL")]
    pub license_server_url: Option<String>,

    /// Report validation results to the license server
    #[arg(long, env = "PHONE_HOME_ENABLED", default_value = "true", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub phone_home_enabled: bool,

    /// Retries after a failed report
    #[arg(long, env = "PHONE_HOME_RETRIES", default_value_t = 3)]
    pub phone_home_retries: u32,

    /// Time budget of one report, retries included
    #[arg(long, env = "PHONE_HOME_TIMEOUT", default_value = "30s", value_parser = parse_duration)]
    pub phone_home_timeout: Duration,

    /// Time between validation cycles
    #[arg(long, env = "VALIDATION_INTERVAL", default_value = "5m", value_parser = parse_duration)]
    pub validation_interval: Duration,

    /// Stay ready while the license is in its grace period
    #[arg(long, env = "FAIL_OPEN", default_value = "true", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub fail_open: bool,

    /// Port for the health, readiness and status endpoints
    #[arg(long, env = "HTTP_PORT", default_value_t = 8080)]
    pub http_port: u16,

    /// Log filter directive (overridden by RUST_LOG)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Config {
    /// Checks constraints clap cannot express.
    pub fn validate(&self) -> ValidatorResult<()> {
        if self.validation_interval.is_zero() {
            return Err(ValidatorError::Config(
                "validation interval must be greater than zero".into(),
            ));
        }
        if self.phone_home_timeout.is_zero() {
            return Err(ValidatorError::Config(
                "phone-home timeout must be greater than zero".into(),
            ));
        }
        if self.license_secret_namespace.is_empty() {
            return Err(ValidatorError::Config("license secret namespace is empty".into()));
        }
        Ok(())
    }

    /// Returns the trusted public key PEM, reading it from disk if configured by path.
    pub fn public_key_pem(&self) -> ValidatorResult<String> {
        if let Some(pem) = &self.public_key {
            return Ok(pem.clone());
        }
        match &self.public_key_file {
            Some(path) => std::fs::read_to_string(path).map_err(|source| ValidatorError::Io {
                path: path.clone(),
                source,
            }),
            None => Err(ValidatorError::Config(
                "one of ES_PUBLIC_KEY or ES_PUBLIC_KEY_FILE is required".into(),
            )),
        }
    }

    /// `key=value` selector for licensed nodes.
    pub fn label_selector(&self) -> String {
        format!("{}={}", self.node_label_key, self.node_label_value)
    }

    pub fn reporter_config(&self) -> ReporterConfig {
        ReporterConfig {
            endpoint: self.license_server_url.clone().filter(|u| !u.is_empty()),
            max_retries: self.phone_home_retries,
            request_timeout: self.phone_home_timeout,
            ..ReporterConfig::default()
        }
    }
}

/// Parses durations such as `30`, `500ms`, `30s`, `5m`, `1h 30m` or `90sec`.
/// A bare number is seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| format!("invalid duration '{input}': {e}"))
}
