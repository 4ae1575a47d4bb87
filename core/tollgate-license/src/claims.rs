//! License claim schema and decoding.

use crate::error::{LicenseError, LicenseResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Telemetry preferences embedded in the license (`phone_home` claim).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneHome {
    /// Whether the issuer asks for validation reports.
    pub enabled: bool,
    /// Base URL of the issuer's license server.
    pub url: String,
    /// Requested reporting interval.
    pub interval_hours: u32,
}

/// A license decoded from verified claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Issuer (`iss`).
    pub issuer: String,
    /// Subject (`sub`).
    pub subject: String,
    /// Issued-at (`iat`).
    pub issued_at: Option<DateTime<Utc>>,
    /// Expiration (`exp`).
    pub expires_at: DateTime<Utc>,
    /// Not-before (`nbf`).
    pub not_before: Option<DateTime<Utc>>,

    pub license_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub product_code: String,
    pub product_name: String,
    pub tier_code: String,
    pub tier_name: String,
    pub cluster_id: String,
    pub cluster_name: String,
    /// Namespace the license is bound to.
    pub namespace: String,
    /// Node ceiling enforced by the capacity check.
    pub licensed_nodes: u32,
    /// Optional hard cap, informational only.
    pub max_nodes: Option<u32>,
    pub node_selector: BTreeMap<String, String>,
    pub features: BTreeSet<String>,
    pub grace_period_days: u32,
    pub warning_days: u32,
    pub phone_home: PhoneHome,
}

impl License {
    /// Decodes a verified claim set.
    ///
    /// `license_id`, `exp`, `namespace` and `licensed_nodes` are mandatory and
    /// must have the right shape. Every other claim is optional: when it is
    /// absent or ill-typed it takes its empty value. Non-string entries in
    /// `node_selector` and `features` are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::ClaimsInvalid`] when a mandatory claim is
    /// missing or cannot be decoded.
    pub fn from_claims(claims: &Map<String, Value>) -> LicenseResult<Self> {
        let license_id = required_string(claims, "license_id")?;
        let namespace = required_string(claims, "namespace")?;

        let exp = claims
            .get("exp")
            .ok_or_else(|| missing("exp"))
            .and_then(|v| integer(v).ok_or_else(|| ill_typed("exp", "a numeric timestamp")))?;
        let expires_at = timestamp(exp).ok_or_else(|| ill_typed("exp", "an in-range timestamp"))?;

        let licensed_nodes = claims
            .get("licensed_nodes")
            .ok_or_else(|| missing("licensed_nodes"))
            .and_then(|v| count(v).ok_or_else(|| ill_typed("licensed_nodes", "a non-negative integer")))?;

        Ok(Self {
            issuer: optional_string(claims, "iss"),
            subject: optional_string(claims, "sub"),
            issued_at: claims.get("iat").and_then(integer).and_then(timestamp),
            expires_at,
            not_before: claims.get("nbf").and_then(integer).and_then(timestamp),
            license_id,
            customer_id: optional_string(claims, "customer_id"),
            customer_name: optional_string(claims, "customer_name"),
            product_code: optional_string(claims, "product_code"),
            product_name: optional_string(claims, "product_name"),
            tier_code: optional_string(claims, "tier_code"),
            tier_name: optional_string(claims, "tier_name"),
            cluster_id: optional_string(claims, "cluster_id"),
            cluster_name: optional_string(claims, "cluster_name"),
            namespace,
            licensed_nodes,
            max_nodes: claims.get("max_nodes").and_then(count),
            node_selector: claims
                .get("node_selector")
                .and_then(Value::as_object)
                .map(|map| {
                    map.iter()
                        .filter_map(|(k, v)| Some((k.clone(), v.as_str()?.to_string())))
                        .collect()
                })
                .unwrap_or_default(),
            features: claims
                .get("features")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|f| f.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default(),
            grace_period_days: claims.get("grace_period_days").and_then(count).unwrap_or(0),
            warning_days: claims.get("warning_days").and_then(count).unwrap_or(0),
            phone_home: claims
                .get("phone_home")
                .and_then(Value::as_object)
                .map(|ph| PhoneHome {
                    enabled: ph.get("enabled").and_then(Value::as_bool).unwrap_or(false),
                    url: ph
                        .get("url")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    interval_hours: ph.get("interval_hours").and_then(count).unwrap_or(0),
                })
                .unwrap_or_default(),
        })
    }

    /// Returns true if the license grants the named feature.
    ///
    /// An empty feature set grants nothing.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

fn missing(claim: &str) -> LicenseError {
    LicenseError::ClaimsInvalid(format!("missing mandatory claim '{claim}'"))
}

fn ill_typed(claim: &str, expected: &str) -> LicenseError {
    LicenseError::ClaimsInvalid(format!("claim '{claim}' must be {expected}"))
}

fn required_string(claims: &Map<String, Value>, claim: &str) -> LicenseResult<String> {
    match claims.get(claim) {
        None | Some(Value::Null) => Err(missing(claim)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ill_typed(claim, "a string")),
    }
}

fn optional_string(claims: &Map<String, Value>, claim: &str) -> String {
    claims
        .get(claim)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Accepts JSON integers and integral floats (`1.7e9`).
fn integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .filter(|f| *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn count(value: &Value) -> Option<u32> {
    integer(value).and_then(|n| u32::try_from(n).ok())
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
