//! Classification of a validation result into a single reported status.

use serde::{Deserialize, Serialize};
use std::fmt;
use tollgate_license::ValidationResult;

/// The status code sent with a telemetry report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    GracePeriod,
    Expired,
    NodeLimitExceeded,
    InvalidSignature,
    Invalid,
}

impl ValidationStatus {
    /// Classifies a result. The first matching rule wins:
    ///
    /// 1. valid
    /// 2. in grace period
    /// 3. expiry check failed
    /// 4. capacity check failed
    /// 5. signature check failed
    /// 6. anything else
    #[must_use]
    pub fn of(result: &ValidationResult) -> Self {
        if result.is_valid() {
            Self::Valid
        } else if result.in_grace_period {
            Self::GracePeriod
        } else if !result.expiry_valid {
            Self::Expired
        } else if !result.node_count_valid {
            Self::NodeLimitExceeded
        } else if !result.signature_valid {
            Self::InvalidSignature
        } else {
            Self::Invalid
        }
    }

    /// The wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::GracePeriod => "grace_period",
            Self::Expired => "expired",
            Self::NodeLimitExceeded => "node_limit_exceeded",
            Self::InvalidSignature => "invalid_signature",
            Self::Invalid => "invalid",
        }
    }

    /// Human-readable message for a result classified as `self`.
    #[must_use]
    pub fn message(&self, result: &ValidationResult) -> String {
        match self {
            Self::Valid => "License is valid".to_string(),
            Self::GracePeriod => format!(
                "License expired but in grace period ({} days since expiry)",
                -result.days_until_expiry
            ),
            Self::Expired => "License has expired".to_string(),
            Self::NodeLimitExceeded => format!(
                "Node count ({}) exceeds licensed nodes ({})",
                result.node_count, result.licensed_nodes
            ),
            Self::InvalidSignature => "Invalid license signature".to_string(),
            Self::Invalid => result
                .error
                .as_ref()
                .map_or_else(|| "License validation failed".to_string(), ToString::to_string),
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
