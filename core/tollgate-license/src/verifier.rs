//! License token parsing and RS512 signature verification.
//!
//! License tokens are compact JWS strings:
//! `base64url(header).base64url(claims).base64url(signature)`.
//!
//! The verifier owns both the trusted key and the expected algorithm. The
//! header's `alg` is compared against [`EXPECTED_ALGORITHM`] before any
//! signature work, so `none`, HMAC and other asymmetric algorithms are
//! refused outright instead of being used to pick a verification routine.

use crate::claims::License;
use crate::error::{LicenseError, LicenseResult};
use crate::validation::{evaluate, ValidationResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::{Map, Value};

/// The only signing algorithm accepted for license tokens.
pub const EXPECTED_ALGORITHM: Algorithm = Algorithm::RS512;

/// The subset of the JOSE header inspected before verification.
#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: Option<Value>,
}

/// Verifies license tokens against a trusted RSA public key.
pub struct LicenseVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for LicenseVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseVerifier")
            .field("algorithm", &EXPECTED_ALGORITHM)
            .finish_non_exhaustive()
    }
}

impl LicenseVerifier {
    /// Creates a verifier from a PEM-encoded RSA public key (SPKI or PKCS#1).
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidPublicKey`] if the PEM cannot be parsed
    /// or does not hold an RSA key.
    pub fn from_pem(public_key_pem: &str) -> LicenseResult<Self> {
        let key = DecodingKey::from_rsa_pem(public_key_pem.trim().as_bytes())
            .map_err(|e| LicenseError::InvalidPublicKey(e.to_string()))?;

        // Registered-claim checks are the validation engine's job: an expired
        // token still has to decode so its grace period can be computed.
        let mut validation = Validation::new(EXPECTED_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Ok(Self { key, validation })
    }

    /// Verifies a token and decodes its claims into a [`License`].
    ///
    /// # Errors
    ///
    /// - [`LicenseError::MalformedToken`] if the token is not a compact JWS
    /// - [`LicenseError::UnsupportedAlgorithm`] if the header does not name RS512
    /// - [`LicenseError::SignatureInvalid`] if the signature does not verify
    /// - [`LicenseError::ClaimsInvalid`] if the claims do not fit the schema
    pub fn verify(&self, token: &str) -> LicenseResult<License> {
        let token = token.trim();
        check_algorithm(token)?;

        let data = jsonwebtoken::decode::<Map<String, Value>>(token, &self.key, &self.validation)
            .map_err(map_jwt_error)?;

        License::from_claims(&data.claims)
    }

    /// Verifies a token and evaluates it in one step.
    ///
    /// A token that fails verification yields [`ValidationResult::failed`]
    /// carrying the verification error.
    #[must_use]
    pub fn validate(
        &self,
        token: &str,
        now: DateTime<Utc>,
        node_count: u32,
        namespace: &str,
    ) -> ValidationResult {
        match self.verify(token) {
            Ok(license) => evaluate(license, now, node_count, namespace),
            Err(err) => ValidationResult::failed(err, now, node_count, namespace),
        }
    }
}

/// Rejects any token whose header does not name [`EXPECTED_ALGORITHM`].
fn check_algorithm(token: &str) -> LicenseResult<()> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(LicenseError::MalformedToken(
            "token must have exactly three parts separated by dots".to_string(),
        ));
    }

    let header_json = URL_SAFE_NO_PAD
        .decode(segments[0])
        .map_err(|e| LicenseError::MalformedToken(format!("invalid header base64: {e}")))?;
    let header: RawHeader = serde_json::from_slice(&header_json)
        .map_err(|e| LicenseError::MalformedToken(format!("invalid header JSON: {e}")))?;

    match header.alg {
        Some(Value::String(alg)) if alg.parse::<Algorithm>().ok() == Some(EXPECTED_ALGORITHM) => {
            Ok(())
        }
        Some(Value::String(alg)) => Err(LicenseError::UnsupportedAlgorithm(alg)),
        Some(other) => Err(LicenseError::UnsupportedAlgorithm(other.to_string())),
        None => Err(LicenseError::UnsupportedAlgorithm("<missing>".to_string())),
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> LicenseError {
    match err.kind() {
        ErrorKind::InvalidSignature => LicenseError::SignatureInvalid,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName | ErrorKind::MissingAlgorithm => {
            LicenseError::UnsupportedAlgorithm(err.to_string())
        }
        ErrorKind::Json(_) => LicenseError::ClaimsInvalid(err.to_string()),
        _ => LicenseError::MalformedToken(err.to_string()),
    }
}
