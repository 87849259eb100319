//! Shared test helpers for license tests.

#![allow(dead_code)]

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use licenseedict::TokenPayload;
use std::collections::BTreeSet;

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (SigningKey, VerifyingKey) {
    let seed: [u8; 32] = [
        1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    let signing_key = SigningKey::from_bytes(&seed);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key)
}

/// A second, unrelated key pair.
pub fn other_keypair() -> (SigningKey, VerifyingKey) {
    let signing_key = SigningKey::from_bytes(&[7u8; 32]);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key)
}

/// Standard-base64 form of a public key.
pub fn encode_public_key(key: &VerifyingKey) -> String {
    BASE64.encode(key.to_bytes())
}

/// Signs raw payload bytes: `base64(signature || payload)`.
pub fn sign_bytes(signing_key: &SigningKey, payload: &[u8]) -> String {
    let signature = signing_key.sign(payload);
    let mut combined = signature.to_bytes().to_vec();
    combined.extend_from_slice(payload);
    BASE64.encode(combined)
}

/// Serializes and signs a payload.
pub fn sign_payload(signing_key: &SigningKey, payload: &TokenPayload) -> String {
    let json = serde_json::to_vec(payload).unwrap();
    sign_bytes(signing_key, &json)
}

/// A payload issued at `issued_at` and expiring at `expires_at`.
pub fn payload_between(
    issued_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
) -> TokenPayload {
    TokenPayload {
        license_id: "lic_123".to_string(),
        product_id: "prod_456".to_string(),
        license_key: "ABCD-EFGH-IJKL".to_string(),
        licensee: "Acme Corp".to_string(),
        plan: "pro".to_string(),
        features: BTreeSet::from(["PRO".to_string(), "EXPORT".to_string()]),
        max_seats: 5,
        issued_at,
        expires_at,
        server_url: None,
    }
}

/// Issued an hour ago, expiring in 30 days.
pub fn active_payload() -> TokenPayload {
    let now = Utc::now();
    payload_between(Some(now - Duration::hours(1)), Some(now + Duration::days(30)))
}

/// A signed token for an active 30-day license.
pub fn active_token(signing_key: &SigningKey) -> String {
    sign_payload(signing_key, &active_payload())
}

/// A signed token whose license expired a day ago.
pub fn expired_token(signing_key: &SigningKey) -> String {
    let now = Utc::now();
    let payload = payload_between(Some(now - Duration::days(60)), Some(now - Duration::days(1)));
    sign_payload(signing_key, &payload)
}

/// A signed active token carrying a server URL.
pub fn token_with_server(signing_key: &SigningKey, server_url: &str) -> String {
    let mut payload = active_payload();
    payload.server_url = Some(server_url.to_string());
    sign_payload(signing_key, &payload)
}

/// Flips one byte inside the signature of a token.
pub fn corrupt_signature(token: &str) -> String {
    let mut raw = BASE64.decode(token).unwrap();
    raw[0] ^= 0xFF;
    BASE64.encode(raw)
}

/// Client configuration verifying with `public_key` and caching under `cache_dir`.
pub fn client_config(
    public_key: VerifyingKey,
    cache_dir: &std::path::Path,
) -> licenseedict::ClientConfig {
    licenseedict::ClientConfig::new()
        .with_verifying_key(public_key)
        .with_cache_dir(cache_dir)
}

/// A token expiring `expires_in` from now, carrying `server_url`.
pub fn token_expiring_in(signing_key: &SigningKey, expires_in: Duration, server_url: &str) -> String {
    let now = Utc::now();
    let mut payload = payload_between(Some(now - Duration::hours(1)), Some(now + expires_in));
    payload.server_url = Some(server_url.to_string());
    sign_payload(signing_key, &payload)
}
