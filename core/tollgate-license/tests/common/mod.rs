//! Shared test helpers for license tests.

#![allow(dead_code)]

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tollgate_license::License;

pub const TRUSTED_PRIVATE_PEM: &str = include_str!("../../../../testdata/keys/trusted_private.pem");
pub const TRUSTED_PUBLIC_PEM: &str = include_str!("../../../../testdata/keys/trusted_public.pem");
pub const UNTRUSTED_PRIVATE_PEM: &str =
    include_str!("../../../../testdata/keys/untrusted_private.pem");
pub const EC_PUBLIC_PEM: &str = include_str!("../../../../testdata/keys/ec_public.pem");

/// A complete claim set expiring `expires_in` from now.
pub fn full_claims(expires_in: TimeDelta) -> Value {
    let now = Utc::now();
    json!({
        "iss": "licensing.example.com",
        "sub": "cust-42",
        "iat": now.timestamp(),
        "nbf": now.timestamp(),
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
        "max_nodes": 8,
        "node_selector": { "es-products.io/licensed": "true" },
        "features": ["sso", "audit-log"],
        "grace_period_days": 7,
        "warning_days": 30,
        "phone_home": {
            "enabled": true,
            "url": "https://licensing.example.com",
            "interval_hours": 24
        }
    })
}

/// Signs claims with the given algorithm and PEM private key.
pub fn sign_with(alg: Algorithm, private_pem: &str, claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).unwrap();
    jsonwebtoken::encode(&Header::new(alg), claims, &key).unwrap()
}

/// Signs claims with the trusted key using RS512.
pub fn sign(claims: &Value) -> String {
    sign_with(Algorithm::RS512, TRUSTED_PRIVATE_PEM, claims)
}

/// Builds an unsigned token with an arbitrary header.
pub fn unsigned_token(header: &Value, claims: &Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header_b64}.{claims_b64}.")
}

/// A license fixture with the fields the engine reads.
pub fn license(
    expires_at: DateTime<Utc>,
    licensed_nodes: u32,
    grace_period_days: u32,
    namespace: &str,
) -> License {
    let mut claims = full_claims(TimeDelta::days(1));
    claims["exp"] = json!(expires_at.timestamp());
    claims["licensed_nodes"] = json!(licensed_nodes);
    claims["grace_period_days"] = json!(grace_period_days);
    claims["namespace"] = json!(namespace);
    let mut license = License::from_claims(claims.as_object().unwrap()).unwrap();
    // keep sub-second precision for boundary tests
    license.expires_at = expires_at;
    license
}
