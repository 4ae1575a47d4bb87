//! Error types for license verification and validation.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Licensing-specific errors.
///
/// Verification errors are produced by [`LicenseVerifier`](crate::LicenseVerifier);
/// the check-failure variants describe why an evaluated license is not usable.
/// Errors are carried inside an immutable [`ValidationResult`](crate::ValidationResult),
/// so they hold owned strings rather than foreign error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LicenseError {
    /// The configured trusted public key could not be loaded.
    #[error("invalid trusted public key: {0}")]
    InvalidPublicKey(String),

    /// Token is not a parseable compact JWS.
    #[error("malformed license token: {0}")]
    MalformedToken(String),

    /// Token header names an algorithm other than the trusted one.
    #[error(
        "unsupported signing algorithm '{0}' (expected {expected:?})",
        expected = crate::verifier::EXPECTED_ALGORITHM
    )]
    UnsupportedAlgorithm(String),

    /// RSA signature verification failed under the trusted key.
    #[error("license token signature invalid")]
    SignatureInvalid,

    /// Claims are present but do not decode to the license schema.
    #[error("invalid license claims: {0}")]
    ClaimsInvalid(String),

    /// License is bound to a different namespace.
    #[error(
        "namespace mismatch: license is for namespace '{expected}' but validator is running in '{actual}'"
    )]
    NamespaceMismatch { expected: String, actual: String },

    /// More nodes are running than the license allows.
    #[error("node count ({observed}) exceeds licensed nodes ({licensed})")]
    NodeLimitExceeded { observed: u32, licensed: u32 },

    /// License has expired.
    #[error("license expired on {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    /// The license token could not be retrieved.
    #[error("license source unavailable: {0}")]
    Source(String),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
