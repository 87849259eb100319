//! Signed token decoding and Ed25519 signature verification.
//!
//! A signed token is a single standard-base64 blob:
//!
//! ```text
//! base64( signature[64] || payload_json )
//! ```
//!
//! The signature covers the exact payload bytes that follow it in the blob,
//! not a re-serialization of the decoded payload.

use crate::error::{ErrorCode, ValidationError};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use ed25519_dalek::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH, Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Size of the raw Ed25519 signature prefix.
pub const SIGNATURE_SIZE: usize = SIGNATURE_LENGTH;

/// Size of a raw Ed25519 public key.
pub const PUBLIC_KEY_SIZE: usize = PUBLIC_KEY_LENGTH;

/// The payload carried inside a signed token (matches server JSON structure).
///
/// Only [`verify_token`] produces a payload that may be trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenPayload {
    /// License identifier.
    pub license_id: String,
    /// Product identifier.
    pub product_id: String,
    /// Human-facing license key.
    pub license_key: String,
    /// Licensee name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub licensee: String,
    /// Plan name.
    pub plan: String,
    /// Enabled feature flags.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub features: BTreeSet<String>,
    /// Maximum concurrent seats.
    pub max_seats: u32,
    /// Issued-at timestamp.
    #[serde(with = "optional_time")]
    pub issued_at: Option<DateTime<Utc>>,
    /// Expiry timestamp, or None for a non-expiring license.
    #[serde(with = "optional_time", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Licensing server base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

/// Verifies the token signature and returns the decoded payload.
///
/// No temporal judgement is made here. Leading and trailing whitespace
/// around the token (for example a newline from a pasted or file-loaded
/// token) is ignored.
///
/// # Errors
///
/// - `LicenseDecodeError` if the token is not base64, is too short, or the
///   signed payload is not valid JSON.
/// - `InvalidLicenseSignature` if the signature does not verify.
pub fn verify_token(
    public_key: &VerifyingKey,
    signed_token: &str,
) -> Result<TokenPayload, ValidationError> {
    let combined = decode_blob(signed_token)?;
    let (sig_bytes, payload_bytes) = combined.split_at(SIGNATURE_SIZE);

    let signature = Signature::from_slice(sig_bytes).map_err(|e| {
        ValidationError::with_source(ErrorCode::LicenseDecodeError, "invalid signature bytes", e)
    })?;

    public_key.verify(payload_bytes, &signature).map_err(|_| {
        ValidationError::new(
            ErrorCode::InvalidLicenseSignature,
            "Ed25519 signature verification failed",
        )
    })?;

    parse_payload(payload_bytes)
}

/// Decodes the payload WITHOUT checking the signature.
///
/// Useful for peeking at fields such as `server_url` before a key is
/// available. The result must never be treated as trusted.
///
/// # Errors
///
/// Returns `LicenseDecodeError` on malformed input.
pub fn decode_unverified(signed_token: &str) -> Result<TokenPayload, ValidationError> {
    let combined = decode_blob(signed_token)?;
    parse_payload(&combined[SIGNATURE_SIZE..])
}

/// Decodes a standard-base64 Ed25519 public key.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns `PubKeyDecodeError` on malformed base64, wrong length, or bytes
/// that are not a valid curve point.
pub fn decode_public_key(encoded: &str) -> Result<VerifyingKey, ValidationError> {
    let decoded = BASE64.decode(encoded.trim()).map_err(|e| {
        ValidationError::with_source(
            ErrorCode::PubKeyDecodeError,
            "failed to base64-decode public key",
            e,
        )
    })?;

    let bytes: [u8; PUBLIC_KEY_SIZE] = decoded.as_slice().try_into().map_err(|_| {
        ValidationError::new(ErrorCode::PubKeyDecodeError, "invalid public key length")
    })?;

    VerifyingKey::from_bytes(&bytes).map_err(|e| {
        ValidationError::with_source(ErrorCode::PubKeyDecodeError, "invalid public key", e)
    })
}

fn decode_blob(signed_token: &str) -> Result<Vec<u8>, ValidationError> {
    let combined = BASE64.decode(signed_token.trim()).map_err(|e| {
        ValidationError::with_source(
            ErrorCode::LicenseDecodeError,
            "failed to base64-decode token",
            e,
        )
    })?;

    if combined.len() <= SIGNATURE_SIZE {
        return Err(ValidationError::new(
            ErrorCode::LicenseDecodeError,
            "token too short",
        ));
    }

    Ok(combined)
}

fn parse_payload(payload_bytes: &[u8]) -> Result<TokenPayload, ValidationError> {
    serde_json::from_slice(payload_bytes).map_err(|e| {
        ValidationError::with_source(
            ErrorCode::LicenseDecodeError,
            "failed to decode token payload",
            e,
        )
    })
}

/// RFC 3339 timestamps where a missing value, `null`, or the all-zero
/// `0001-01-01T00:00:00Z` sentinel all mean "not set".
pub(crate) mod optional_time {
    use chrono::{DateTime, Datelike, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
        Ok(value.filter(|t| t.year() > 1))
    }
}
