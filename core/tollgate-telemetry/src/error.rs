//! Telemetry error types.

use thiserror::Error;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors that can occur while reporting a validation result.
///
/// None of these ever feed back into the validation verdict.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("validation result carries no license; nothing to report")]
    MissingLicense,

    #[error("no telemetry endpoint configured or embedded in the license")]
    NoEndpoint,

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{}", rejected_message(.status, .message))]
    ServerRejected { status: Option<u16>, message: String },

    #[error("failed to decode server response: {0}")]
    Decode(String),

    #[error("telemetry delivery failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<TelemetryError>,
    },

    #[error("telemetry cancelled")]
    Cancelled,

    #[error("telemetry deadline exceeded")]
    DeadlineExceeded,
}

fn rejected_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("server returned error status {code}: {message}"),
        None => format!("server rejected report: {message}"),
    }
}

impl TelemetryError {
    /// Returns true if the error came from the context rather than the server.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, TelemetryError::Cancelled | TelemetryError::DeadlineExceeded)
    }
}
