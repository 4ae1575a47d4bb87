mod common;

use chrono::{TimeDelta, Utc};
use common::{
    full_claims, sign, sign_with, unsigned_token, EC_PUBLIC_PEM, TRUSTED_PRIVATE_PEM,
    TRUSTED_PUBLIC_PEM, UNTRUSTED_PRIVATE_PEM,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::json;
use tollgate_license::{LicenseError, LicenseVerifier};

fn verifier() -> LicenseVerifier {
    LicenseVerifier::from_pem(TRUSTED_PUBLIC_PEM).unwrap()
}

// ── Verifier construction ────────────────────────────────────────

#[test]
fn from_pem_accepts_rsa_spki() {
    assert!(LicenseVerifier::from_pem(TRUSTED_PUBLIC_PEM).is_ok());
}

#[test]
fn from_pem_rejects_garbage() {
    let err = LicenseVerifier::from_pem("not a pem").unwrap_err();
    assert!(matches!(err, LicenseError::InvalidPublicKey(_)));
}

#[test]
fn from_pem_rejects_non_rsa_key() {
    let err = LicenseVerifier::from_pem(EC_PUBLIC_PEM).unwrap_err();
    assert!(matches!(err, LicenseError::InvalidPublicKey(_)));
}

// ── Successful verification ──────────────────────────────────────

#[test]
fn verify_decodes_all_claims() {
    let token = sign(&full_claims(TimeDelta::days(90)));
    let license = verifier().verify(&token).unwrap();

    assert_eq!(license.issuer, "licensing.example.com");
    assert_eq!(license.subject, "cust-42");
    assert!(license.issued_at.is_some());
    assert!(license.not_before.is_some());
    assert_eq!(license.license_id, "lic-0001");
    assert_eq!(license.customer_id, "cust-42");
    assert_eq!(license.customer_name, "Acme Corp");
    assert_eq!(license.product_code, "ES-PLATFORM");
    assert_eq!(license.product_name, "ES Platform");
    assert_eq!(license.tier_code, "ENT");
    assert_eq!(license.tier_name, "Enterprise");
    assert_eq!(license.cluster_id, "cluster-a");
    assert_eq!(license.cluster_name, "Production A");
    assert_eq!(license.namespace, "prod");
    assert_eq!(license.licensed_nodes, 5);
    assert_eq!(license.max_nodes, Some(8));
    assert_eq!(license.node_selector["es-products.io/licensed"], "true");
    assert!(license.has_feature("sso"));
    assert!(license.has_feature("audit-log"));
    assert!(!license.has_feature("multi-region"));
    assert_eq!(license.grace_period_days, 7);
    assert_eq!(license.warning_days, 30);
    assert!(license.phone_home.enabled);
    assert_eq!(license.phone_home.url, "https://licensing.example.com");
    assert_eq!(license.phone_home.interval_hours, 24);
    assert!(license.expires_at > Utc::now());
}

#[test]
fn verify_tolerates_surrounding_whitespace() {
    let token = sign(&full_claims(TimeDelta::days(1)));
    let padded = format!("  {token}\n");
    assert!(verifier().verify(&padded).is_ok());
}

#[test]
fn verify_accepts_expired_token() {
    // expiry is judged by the engine, not the verifier
    let token = sign(&full_claims(TimeDelta::days(-30)));
    let license = verifier().verify(&token).unwrap();
    assert!(license.expires_at < Utc::now());
}

#[test]
fn verify_accepts_token_with_audience() {
    let mut claims = full_claims(TimeDelta::days(1));
    claims["aud"] = json!("some-cluster");
    assert!(verifier().verify(&sign(&claims)).is_ok());
}

// ── Algorithm confusion ──────────────────────────────────────────

#[test]
fn none_algorithm_is_rejected() {
    let token = unsigned_token(
        &json!({"alg": "none", "typ": "JWT"}),
        &full_claims(TimeDelta::days(1)),
    );
    let err = verifier().verify(&token).unwrap_err();
    assert_eq!(err, LicenseError::UnsupportedAlgorithm("none".to_string()));
}

#[test]
fn missing_algorithm_is_rejected() {
    let token = unsigned_token(&json!({"typ": "JWT"}), &full_claims(TimeDelta::days(1)));
    let err = verifier().verify(&token).unwrap_err();
    assert!(matches!(err, LicenseError::UnsupportedAlgorithm(_)));
}

#[test]
fn algorithm_name_is_case_sensitive() {
    let token = unsigned_token(
        &json!({"alg": "rs512", "typ": "JWT"}),
        &full_claims(TimeDelta::days(1)),
    );
    let err = verifier().verify(&token).unwrap_err();
    assert_eq!(err, LicenseError::UnsupportedAlgorithm("rs512".to_string()));
}

#[test]
fn hmac_with_public_key_as_secret_is_rejected() {
    // Classic confusion: HMAC keyed with the verifier's own public key.
    let key = EncodingKey::from_secret(TRUSTED_PUBLIC_PEM.as_bytes());
    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS512),
        &full_claims(TimeDelta::days(1)),
        &key,
    )
    .unwrap();
    let err = verifier().verify(&token).unwrap_err();
    assert_eq!(err, LicenseError::UnsupportedAlgorithm("HS512".to_string()));
}

#[test]
fn weaker_rsa_algorithm_is_rejected() {
    let token = sign_with(
        Algorithm::RS256,
        TRUSTED_PRIVATE_PEM,
        &full_claims(TimeDelta::days(1)),
    );
    let err = verifier().verify(&token).unwrap_err();
    assert_eq!(err, LicenseError::UnsupportedAlgorithm("RS256".to_string()));
}

#[test]
fn pss_algorithm_is_rejected() {
    let token = sign_with(
        Algorithm::PS512,
        TRUSTED_PRIVATE_PEM,
        &full_claims(TimeDelta::days(1)),
    );
    assert!(matches!(
        verifier().verify(&token),
        Err(LicenseError::UnsupportedAlgorithm(_))
    ));
}

// ── Signature failures ───────────────────────────────────────────

#[test]
fn untrusted_key_is_rejected() {
    let token = sign_with(
        Algorithm::RS512,
        UNTRUSTED_PRIVATE_PEM,
        &full_claims(TimeDelta::days(1)),
    );
    assert_eq!(
        verifier().verify(&token).unwrap_err(),
        LicenseError::SignatureInvalid
    );
}

#[test]
fn swapped_claims_are_rejected() {
    let genuine = sign(&full_claims(TimeDelta::days(1)));
    let mut forged_claims = full_claims(TimeDelta::days(1));
    forged_claims["licensed_nodes"] = json!(500);
    let forged = sign_with(Algorithm::RS512, UNTRUSTED_PRIVATE_PEM, &forged_claims);

    let genuine_parts: Vec<&str> = genuine.split('.').collect();
    let forged_parts: Vec<&str> = forged.split('.').collect();
    let spliced = format!("{}.{}.{}", genuine_parts[0], forged_parts[1], genuine_parts[2]);

    assert_eq!(
        verifier().verify(&spliced).unwrap_err(),
        LicenseError::SignatureInvalid
    );
}

#[test]
fn stripped_signature_is_rejected() {
    let token = sign(&full_claims(TimeDelta::days(1)));
    let parts: Vec<&str> = token.split('.').collect();
    let stripped = format!("{}.{}.", parts[0], parts[1]);
    assert!(verifier().verify(&stripped).is_err());
}

// ── Malformed tokens ─────────────────────────────────────────────

#[test]
fn token_without_dots_is_malformed() {
    assert!(matches!(
        verifier().verify("nodothere"),
        Err(LicenseError::MalformedToken(_))
    ));
}

#[test]
fn token_with_two_parts_is_malformed() {
    assert!(matches!(
        verifier().verify("a.b"),
        Err(LicenseError::MalformedToken(_))
    ));
}

#[test]
fn bad_header_base64_is_malformed() {
    assert!(matches!(
        verifier().verify("!!!.!!!.!!!"),
        Err(LicenseError::MalformedToken(_))
    ));
}

#[test]
fn empty_token_is_malformed() {
    assert!(matches!(
        verifier().verify(""),
        Err(LicenseError::MalformedToken(_))
    ));
}

// ── Claim schema ─────────────────────────────────────────────────

#[test]
fn non_numeric_node_count_is_claims_invalid() {
    let mut claims = full_claims(TimeDelta::days(1));
    claims["licensed_nodes"] = json!("lots");
    let err = verifier().verify(&sign(&claims)).unwrap_err();
    assert!(matches!(err, LicenseError::ClaimsInvalid(_)));
}

#[test]
fn missing_namespace_is_claims_invalid() {
    let mut claims = full_claims(TimeDelta::days(1));
    claims.as_object_mut().unwrap().remove("namespace");
    let err = verifier().verify(&sign(&claims)).unwrap_err();
    assert!(matches!(err, LicenseError::ClaimsInvalid(_)));
}

#[test]
fn missing_optional_claims_default() {
    let claims = json!({
        "license_id": "lic-min",
        "exp": Utc::now().timestamp() + 3600,
        "namespace": "prod",
        "licensed_nodes": 1
    });
    let license = verifier().verify(&sign(&claims)).unwrap();
    assert_eq!(license.customer_name, "");
    assert!(license.features.is_empty());
    assert!(license.max_nodes.is_none());
    assert!(!license.phone_home.enabled);
}

// ── validate() composition ───────────────────────────────────────

#[test]
fn validate_valid_token() {
    let token = sign(&full_claims(TimeDelta::days(90)));
    let result = verifier().validate(&token, Utc::now(), 3, "prod");
    assert!(result.is_valid());
    assert!(result.signature_valid);
    assert!(result.error.is_none());
    assert_eq!(result.licensed_nodes, 5);
}

#[test]
fn validate_unverifiable_token_yields_failed_result() {
    let token = sign_with(
        Algorithm::RS512,
        UNTRUSTED_PRIVATE_PEM,
        &full_claims(TimeDelta::days(90)),
    );
    let result = verifier().validate(&token, Utc::now(), 3, "prod");

    assert!(!result.is_valid());
    assert!(result.license.is_none());
    assert!(!result.signature_valid);
    assert!(!result.expiry_valid);
    assert!(!result.node_count_valid);
    assert!(!result.namespace_valid);
    assert!(!result.in_grace_period);
    assert_eq!(result.error, Some(LicenseError::SignatureInvalid));
    assert_eq!(result.node_count, 3);
    assert_eq!(result.actual_namespace, "prod");
}
