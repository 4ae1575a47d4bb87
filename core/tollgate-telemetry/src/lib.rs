//! Phone-home reporting of license validation results.
//!
//! A [`Reporter`] POSTs a [`TelemetryReport`] derived from a
//! [`ValidationResult`](tollgate_license::ValidationResult) to the license
//! server, retrying with quadratic backoff. Failures are logged and returned
//! to the caller but never change the validation verdict.
//!
//! [`ReportDispatcher`] runs the reporter on a background task so validation
//! cycles are not delayed by a slow or unreachable server.

mod context;
mod dispatcher;
mod error;
mod report;
mod reporter;
mod status;

pub use context::ReportContext;
pub use dispatcher::ReportDispatcher;
pub use error::{TelemetryError, TelemetryResult};
pub use report::{TelemetryReport, TelemetryResponse};
pub use reporter::{DEFAULT_USER_AGENT, Reporter, ReporterConfig, VALIDATE_PATH, backoff_delay};
pub use status::ValidationStatus;
