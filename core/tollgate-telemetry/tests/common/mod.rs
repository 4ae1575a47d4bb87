//! Shared fixtures for telemetry tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tollgate_license::{License, LicenseError, PhoneHome, ValidationResult, evaluate};
use tollgate_telemetry::ReporterConfig;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

pub fn license(expires_at: DateTime<Utc>, licensed_nodes: u32, phone_home_url: &str) -> License {
    License {
        issuer: "licensing.example.com".into(),
        subject: "cust-42".into(),
        issued_at: None,
        expires_at,
        not_before: None,
        license_id: "lic-0001".into(),
        customer_id: "cust-42".into(),
        customer_name: "Acme Corp".into(),
        product_code: "ES-PLATFORM".into(),
        product_name: "ES Platform".into(),
        tier_code: "ENT".into(),
        tier_name: "Enterprise".into(),
        cluster_id: "cluster-a".into(),
        cluster_name: "Production A".into(),
        namespace: "prod".into(),
        licensed_nodes,
        max_nodes: None,
        node_selector: BTreeMap::new(),
        features: BTreeSet::new(),
        grace_period_days: 7,
        warning_days: 30,
        phone_home: PhoneHome {
            enabled: !phone_home_url.is_empty(),
            url: phone_home_url.into(),
            interval_hours: 24,
        },
    }
}

/// A fully valid result expiring in 30 days.
pub fn valid_result() -> ValidationResult {
    evaluate(license(t0() + TimeDelta::days(30), 5, ""), t0(), 3, "prod")
}

/// Expired 3 days ago, inside the 7-day grace period.
pub fn grace_result() -> ValidationResult {
    evaluate(license(t0() - TimeDelta::days(3), 5, ""), t0(), 3, "prod")
}

/// Expired 10 days ago, past the grace period.
pub fn expired_result() -> ValidationResult {
    evaluate(license(t0() - TimeDelta::days(10), 5, ""), t0(), 3, "prod")
}

pub fn over_capacity_result() -> ValidationResult {
    evaluate(license(t0() + TimeDelta::days(30), 5, ""), t0(), 7, "prod")
}

pub fn wrong_namespace_result() -> ValidationResult {
    evaluate(license(t0() + TimeDelta::days(30), 5, ""), t0(), 3, "staging")
}

pub fn signature_failure() -> ValidationResult {
    ValidationResult::failed(LicenseError::SignatureInvalid, t0(), 3, "prod")
}

/// Reporter config pointing at `endpoint` with fast backoff.
pub fn fast_config(endpoint: &str, backoff_unit: Duration) -> ReporterConfig {
    ReporterConfig {
        endpoint: Some(endpoint.to_string()),
        max_retries: 3,
        request_timeout: Duration::from_secs(5),
        backoff_unit,
        ..Default::default()
    }
}
