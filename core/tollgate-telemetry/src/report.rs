//! Wire types for the license server's validate endpoint.

use crate::error::{TelemetryError, TelemetryResult};
use crate::status::ValidationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tollgate_license::ValidationResult;

/// Payload POSTed to `{endpoint}/api/v1/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryReport {
    pub license_id: String,
    pub cluster_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,
    pub node_count: u32,
    pub licensed_nodes: u32,
    pub validation_status: ValidationStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub validation_message: String,
    pub days_until_expiry: i64,
    pub is_in_grace_period: bool,
    pub product_code: String,
    pub tier_code: String,
    /// Transmission time.
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TelemetryReport {
    /// Builds a report from a result that carries a license.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::MissingLicense`] if verification never
    /// produced a license.
    pub fn from_result(result: &ValidationResult, timestamp: DateTime<Utc>) -> TelemetryResult<Self> {
        let license = result.license.as_ref().ok_or(TelemetryError::MissingLicense)?;
        let status = ValidationStatus::of(result);

        let metadata = BTreeMap::from([
            ("customer_id".to_string(), license.customer_id.clone()),
            ("customer_name".to_string(), license.customer_name.clone()),
            ("product_name".to_string(), license.product_name.clone()),
            ("tier_name".to_string(), license.tier_name.clone()),
        ]);

        Ok(Self {
            license_id: license.license_id.clone(),
            cluster_id: license.cluster_id.clone(),
            cluster_name: license.cluster_name.clone(),
            node_count: result.node_count,
            licensed_nodes: result.licensed_nodes,
            validation_status: status,
            validation_message: status.message(result),
            days_until_expiry: result.days_until_expiry,
            is_in_grace_period: result.in_grace_period,
            product_code: license.product_code.clone(),
            tier_code: license.tier_code.clone(),
            timestamp,
            metadata,
        })
    }
}

/// Body returned by the validate endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl TelemetryResponse {
    /// `"success"` and `"ok"` are the only accepted statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success" || self.status == "ok"
    }
}
