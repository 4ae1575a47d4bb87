//! Tollgate license validator service.
//!
//! Periodically reads the cluster's license token, counts licensed nodes,
//! validates both with [`tollgate_license`], and publishes the result for the
//! `/health`, `/ready` and `/status` endpoints. Results that carry a license
//! are reported to the license server through [`tollgate_telemetry`] without
//! ever blocking or changing local validation.

pub mod config;
pub mod error;
pub mod http;
pub mod kube;
pub mod logging;
pub mod service;
pub mod source;
pub mod store;

pub use config::{Config, LogFormat};
pub use error::{ValidatorError, ValidatorResult};
pub use http::{AppState, build_router};
pub use kube::KubeClient;
pub use service::ValidatorService;
pub use source::{FileLicenseSource, LabelNodeCounter, LicenseSource, NodeCounter, SecretLicenseSource};
pub use store::ResultStore;
