//! Shared helpers for validator tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tollgate_license::{License, LicenseVerifier, ValidationResult, evaluate};
use tollgate_validator::{LicenseSource, NodeCounter, ValidatorError, ValidatorResult};

pub const TRUSTED_PRIVATE_PEM: &str = include_str!("../../../testdata/keys/trusted_private.pem");
pub const TRUSTED_PUBLIC_PEM: &str = include_str!("../../../testdata/keys/trusted_public.pem");
pub const UNTRUSTED_PRIVATE_PEM: &str =
    include_str!("../../../testdata/keys/untrusted_private.pem");

/// Claims for a license bound to `prod` with 5 licensed nodes and 7 days of grace.
pub fn claims(expires_in: TimeDelta) -> Value {
    let now = Utc::now();
    json!({
        "iss": "licensing.example.com",
        "sub": "cust-42",
        "iat": now.timestamp(),
        "exp": (now + expires_in).timestamp(),
        "license_id": "lic-0001",
        "customer_id": "cust-42",
        "customer_name": "Acme Corp",
        "product_code": "ES-PLATFORM",
        "product_name": "ES Platform",
        "tier_code": "ENT",
        "tier_name": "Enterprise",
        "cluster_id": "cluster-a",
        "cluster_name": "Production A",
        "namespace": "prod",
        "licensed_nodes": 5,
        "features": ["sso"],
        "grace_period_days": 7,
        "warning_days": 30,
        "phone_home": { "enabled": false, "url": "", "interval_hours": 24 }
    })
}

pub fn sign_with(private_pem: &str, claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
    jsonwebtoken::encode(&Header::new(Algorithm::RS512), claims, &key).unwrap()
}

pub fn sign(claims: &Value) -> String {
    sign_with(TRUSTED_PRIVATE_PEM, claims)
}

pub fn verifier() -> LicenseVerifier {
    LicenseVerifier::from_pem(TRUSTED_PUBLIC_PEM).unwrap()
}

pub fn license(claims: &Value) -> License {
    License::from_claims(claims.as_object().unwrap()).unwrap()
}

/// Evaluates a license built from `claims` at the current time.
pub fn result(claims: &Value, node_count: u32, namespace: &str) -> ValidationResult {
    evaluate(license(claims), Utc::now(), node_count, namespace)
}

/// A source returning a fixed token, or failing when the token is `None`.
pub struct FakeSource {
    token: Mutex<Option<String>>,
    calls: AtomicU32,
}

impl FakeSource {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
            calls: AtomicU32::new(0),
        }
    }

    pub fn set(&self, token: Option<String>) {
        *self.token.lock().unwrap() = token;
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LicenseSource for FakeSource {
    async fn fetch(&self) -> ValidatorResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token
            .lock()
            .unwrap()
            .clone()
            .ok_or(ValidatorError::Api {
                status: 404,
                message: "secrets \"es-license\" not found".into(),
            })
    }

    fn describe(&self) -> String {
        "fake".into()
    }
}

/// A counter returning a fixed count, or failing on demand.
pub struct FakeCounter {
    count: AtomicU32,
    fail: AtomicBool,
}

impl FakeCounter {
    pub fn new(count: u32) -> Self {
        Self {
            count: AtomicU32::new(count),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let counter = Self::new(0);
        counter.fail.store(true, Ordering::SeqCst);
        counter
    }
}

#[async_trait]
impl NodeCounter for FakeCounter {
    async fn count(&self) -> ValidatorResult<u32> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ValidatorError::Transport("connection refused".into()));
        }
        Ok(self.count.load(Ordering::SeqCst))
    }
}
