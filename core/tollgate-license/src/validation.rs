//! The validation engine: temporal, grace-period, capacity and binding checks.

use crate::claims::License;
use crate::error::LicenseError;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// A snapshot of one validation cycle.
///
/// Results are built once and then shared read-only. The overall verdict is
/// not stored; [`ValidationResult::is_valid`] derives it from the sub-checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// The verified license, absent when verification failed.
    pub license: Option<License>,
    /// The error that made this cycle fail, if any.
    pub error: Option<LicenseError>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Whole days until expiry, truncated toward zero. Negative once expired.
    pub days_until_expiry: i64,
    pub in_grace_period: bool,
    /// Observed node count.
    pub node_count: u32,
    pub licensed_nodes: u32,
    pub node_count_valid: bool,
    pub namespace_valid: bool,
    pub signature_valid: bool,
    pub expiry_valid: bool,
    /// Namespace the validator observed.
    pub actual_namespace: String,
    /// Namespace the license is bound to.
    pub license_namespace: String,
    /// When the check ran.
    pub validated_at: DateTime<Utc>,
}

/// Evaluates a verified license at `now`.
///
/// - expiry: valid up to and including the instant `expires_at`
/// - grace: `expires_at < now < expires_at + grace_period_days`
/// - capacity: valid iff `node_count <= licensed_nodes`
/// - binding: valid iff `namespace == license.namespace` (exact, case-sensitive)
///
/// A namespace mismatch attaches [`LicenseError::NamespaceMismatch`].
#[must_use]
pub fn evaluate(
    license: License,
    now: DateTime<Utc>,
    node_count: u32,
    namespace: &str,
) -> ValidationResult {
    let expires_at = license.expires_at;
    let grace_end = expires_at
        .checked_add_signed(TimeDelta::days(i64::from(license.grace_period_days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let days_until_expiry = (expires_at - now).num_days();
    let expiry_valid = now <= expires_at;
    let in_grace_period = now > expires_at && now < grace_end;
    let node_count_valid = node_count <= license.licensed_nodes;
    let namespace_valid = namespace == license.namespace;

    let error = (!namespace_valid).then(|| LicenseError::NamespaceMismatch {
        expected: license.namespace.clone(),
        actual: namespace.to_string(),
    });

    ValidationResult {
        expires_at: Some(expires_at),
        days_until_expiry,
        in_grace_period,
        node_count,
        licensed_nodes: license.licensed_nodes,
        node_count_valid,
        namespace_valid,
        signature_valid: true,
        expiry_valid,
        actual_namespace: namespace.to_string(),
        license_namespace: license.namespace.clone(),
        validated_at: now,
        error,
        license: Some(license),
    }
}

impl ValidationResult {
    /// Builds the result of a cycle that never produced a license.
    ///
    /// Every sub-check is false; the cause is kept in `error`.
    #[must_use]
    pub fn failed(
        error: LicenseError,
        validated_at: DateTime<Utc>,
        node_count: u32,
        actual_namespace: &str,
    ) -> Self {
        Self {
            license: None,
            error: Some(error),
            expires_at: None,
            days_until_expiry: 0,
            in_grace_period: false,
            node_count,
            licensed_nodes: 0,
            node_count_valid: false,
            namespace_valid: false,
            signature_valid: false,
            expiry_valid: false,
            actual_namespace: actual_namespace.to_string(),
            license_namespace: String::new(),
            validated_at,
        }
    }

    /// Overall verdict:
    /// `signature && (expiry || grace) && node_count && namespace`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.signature_valid
            && (self.expiry_valid || self.in_grace_period)
            && self.node_count_valid
            && self.namespace_valid
    }

    /// Returns true while the license is valid but within its warning window.
    #[must_use]
    pub fn in_warning_period(&self) -> bool {
        match &self.license {
            Some(license) => {
                self.expiry_valid && self.days_until_expiry <= i64::from(license.warning_days)
            }
            None => false,
        }
    }

    /// Lists every failed check, starting with the originating error.
    ///
    /// Empty when the license is fully valid.
    #[must_use]
    pub fn failures(&self) -> Vec<LicenseError> {
        let mut failures: Vec<LicenseError> = self.error.iter().cloned().collect();
        if self.license.is_none() {
            return failures;
        }

        if !self.expiry_valid && !self.in_grace_period {
            if let Some(expired_at) = self.expires_at {
                failures.push(LicenseError::Expired { expired_at });
            }
        }
        if !self.node_count_valid {
            failures.push(LicenseError::NodeLimitExceeded {
                observed: self.node_count,
                licensed: self.licensed_nodes,
            });
        }
        let mismatch_reported = failures
            .iter()
            .any(|f| matches!(f, LicenseError::NamespaceMismatch { .. }));
        if !self.namespace_valid && !mismatch_reported {
            failures.push(LicenseError::NamespaceMismatch {
                expected: self.license_namespace.clone(),
                actual: self.actual_namespace.clone(),
            });
        }
        failures
    }

    /// Builds the status document exposed by the status endpoint.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            valid: self.is_valid(),
            validation_time: rfc3339(self.validated_at),
            node_count: self.node_count,
            licensed_nodes: self.licensed_nodes,
            days_until_expiry: self.days_until_expiry,
            in_grace_period: self.in_grace_period,
            signature_valid: self.signature_valid,
            expiry_valid: self.expiry_valid,
            node_count_valid: self.node_count_valid,
            namespace_valid: self.namespace_valid,
            actual_namespace: self.actual_namespace.clone(),
            license_namespace: self.license_namespace.clone(),
            license: self.license.as_ref().map(|l| LicenseSummary {
                license_id: l.license_id.clone(),
                customer_name: l.customer_name.clone(),
                product_code: l.product_code.clone(),
                product_name: l.product_name.clone(),
                tier_code: l.tier_code.clone(),
                cluster_id: l.cluster_id.clone(),
                namespace: l.namespace.clone(),
                expires_at: rfc3339(l.expires_at),
            }),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }
}

/// Serializable view of a [`ValidationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub valid: bool,
    pub validation_time: String,
    pub node_count: u32,
    pub licensed_nodes: u32,
    pub days_until_expiry: i64,
    pub in_grace_period: bool,
    pub signature_valid: bool,
    pub expiry_valid: bool,
    pub node_count_valid: bool,
    pub namespace_valid: bool,
    pub actual_namespace: String,
    pub license_namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<LicenseSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// License fields included in a [`StatusSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseSummary {
    pub license_id: String,
    pub customer_name: String,
    pub product_code: String,
    pub product_name: String,
    pub tier_code: String,
    pub cluster_id: String,
    pub namespace: String,
    pub expires_at: String,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
