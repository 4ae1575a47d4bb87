//! Delivery of validation reports with bounded retries.

use crate::context::ReportContext;
use crate::error::{TelemetryError, TelemetryResult};
use crate::report::{TelemetryReport, TelemetryResponse};
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tollgate_license::{License, ValidationResult};
use tracing::{debug, warn};

/// Path appended to the endpoint base URL.
pub const VALIDATE_PATH: &str = "/api/v1/validate";

/// User agent sent with every report.
pub const DEFAULT_USER_AGENT: &str = concat!("tollgate-validator/", env!("CARGO_PKG_VERSION"));

/// Reporter configuration.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Base URL of the license server. When unset, the license's embedded
    /// `phone_home.url` is used if the license enables phone-home.
    pub endpoint: Option<String>,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// The wait before retry `n` is `backoff_unit * n²`.
    pub backoff_unit: Duration,
    pub user_agent: String,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            max_retries: 3,
            request_timeout: Duration::from_secs(30),
            backoff_unit: Duration::from_secs(1),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Quadratic backoff: `unit * attempt²` (1s, 4s, 9s, ... with a one-second unit).
#[must_use]
pub fn backoff_delay(unit: Duration, attempt: u32) -> Duration {
    unit.saturating_mul(attempt.saturating_mul(attempt))
}

/// Sends validation results to the license server.
pub struct Reporter {
    config: ReporterConfig,
    client: Client,
}

impl Reporter {
    /// Creates a reporter with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Client`] if the HTTP client cannot be built.
    pub fn new(config: ReporterConfig) -> TelemetryResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TelemetryError::Client(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Resolves the base URL to report to for `license`.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::NoEndpoint`] if neither the configuration nor
    /// the license provides one.
    pub fn endpoint_for(&self, license: &License) -> TelemetryResult<String> {
        if let Some(endpoint) = self.config.endpoint.as_deref().filter(|e| !e.is_empty()) {
            return Ok(endpoint.trim_end_matches('/').to_string());
        }
        if license.phone_home.enabled && !license.phone_home.url.is_empty() {
            return Ok(license.phone_home.url.trim_end_matches('/').to_string());
        }
        Err(TelemetryError::NoEndpoint)
    }

    /// Reports `result`, retrying up to `max_retries` times.
    ///
    /// Non-2xx responses, responses whose `status` is not `success`/`ok`, and
    /// transport failures all count as failed attempts. Cancellation or the
    /// context deadline aborts immediately, including during a backoff wait.
    ///
    /// # Errors
    ///
    /// - [`TelemetryError::MissingLicense`] / [`TelemetryError::NoEndpoint`] before any attempt
    /// - [`TelemetryError::RetriesExhausted`] once every attempt has failed
    /// - [`TelemetryError::Cancelled`] / [`TelemetryError::DeadlineExceeded`] from the context
    pub async fn report(&self, ctx: &ReportContext, result: &ValidationResult) -> TelemetryResult<()> {
        let license = result.license.as_ref().ok_or(TelemetryError::MissingLicense)?;
        let url = format!("{}{VALIDATE_PATH}", self.endpoint_for(license)?);
        let report = TelemetryReport::from_result(result, Utc::now())?;

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let err = match ctx.run(self.send(&url, &report)).await? {
                Ok(()) => {
                    debug!(
                        license_id = %report.license_id,
                        status = %report.validation_status,
                        attempts,
                        "Telemetry report accepted"
                    );
                    return Ok(());
                }
                Err(err) => err,
            };

            warn!(attempt = attempts, error = %err, "Telemetry attempt failed");
            if attempts > self.config.max_retries {
                return Err(TelemetryError::RetriesExhausted {
                    attempts,
                    last: Box::new(err),
                });
            }

            ctx.sleep(backoff_delay(self.config.backoff_unit, attempts)).await?;
        }
    }

    async fn send(&self, url: &str, report: &TelemetryReport) -> TelemetryResult<()> {
        let response = self
            .client
            .post(url)
            .json(report)
            .send()
            .await
            .map_err(|e| TelemetryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TelemetryError::ServerRejected {
                status: Some(status.as_u16()),
                message,
            });
        }

        let body: TelemetryResponse = response
            .json()
            .await
            .map_err(|e| TelemetryError::Decode(e.to_string()))?;

        if body.is_success() {
            Ok(())
        } else {
            Err(TelemetryError::ServerRejected {
                status: None,
                message: body.message.unwrap_or(body.status),
            })
        }
    }
}
