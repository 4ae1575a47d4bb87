//! License verification and validation for Tollgate.
//!
//! This crate handles:
//! - RS512 signature verification of license tokens
//! - Decoding verified claims into a typed [`License`]
//! - Temporal, grace-period, capacity and namespace-binding checks
//! - Composing the checks into a [`ValidationResult`]
//!
//! # Design Principles
//!
//! - **Pinned algorithm**: the verifier decides the algorithm and key; the
//!   token header is only checked against that decision, never trusted.
//! - **Pure evaluation**: [`evaluate`] is a function of its inputs. No state
//!   carries over between validation cycles.
//! - **Derived verdict**: overall validity is recomputed from the sub-checks
//!   every time it is read.
//!
//! # License Token Format
//!
//! Tokens are compact JWS strings: `base64url(header).base64url(claims).base64url(signature)`
//! signed with RSASSA-PKCS1-v1_5 over SHA-512. The claim schema is documented
//! on [`License::from_claims`].

mod claims;
mod error;
mod validation;
mod verifier;

pub use claims::{License, PhoneHome};
pub use error::{LicenseError, LicenseResult};
pub use validation::{evaluate, LicenseSummary, StatusSnapshot, ValidationResult};
pub use verifier::{LicenseVerifier, EXPECTED_ALGORITHM};
