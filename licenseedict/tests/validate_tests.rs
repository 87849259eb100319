mod common;

use chrono::{Duration, Utc};
use common::{
    active_token, client_config, corrupt_signature, expired_token, other_keypair,
    payload_between, sign_payload, test_keypair,
};
use licenseedict::{CacheStore, Client, ClientConfig, ErrorCode, FileCache, LicenseError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

// ── Happy path ───────────────────────────────────────────────────

#[tokio::test]
async fn validate_active_token() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let client = Client::new(client_config(pk, dir.path())).unwrap();

    let token = active_token(&sk);
    let license = client.validate(Some(&token)).await.unwrap();

    assert!(license.valid);
    assert_eq!(license.license_id, "lic_123");
    assert_eq!(license.signed_token, token);
    assert!(license.has_feature("PRO"));
    assert!(!license.has_feature("ENTERPRISE"));
    assert!(!license.is_expired());

    assert_eq!(client.license().await, Some(license));
    assert_eq!(client.signed_token().await, Some(token));
}

#[tokio::test]
async fn validate_twice_is_idempotent() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let client = Client::new(client_config(pk, dir.path())).unwrap();
    let token = active_token(&sk);

    let first = client.validate(Some(&token)).await.unwrap();
    let second = client.validate(Some(&token)).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn validate_caches_license() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let client = Client::new(client_config(pk, dir.path())).unwrap();

    let license = client.validate(Some(&active_token(&sk))).await.unwrap();
    let cached = FileCache::new(dir.path()).load().unwrap().unwrap();
    assert_eq!(cached, license);
}

// ── Temporal checks ──────────────────────────────────────────────

#[tokio::test]
async fn expired_license_is_invalid_without_error() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let client = Client::new(client_config(pk, dir.path())).unwrap();

    let license = client.validate(Some(&expired_token(&sk))).await.unwrap();
    assert!(!license.valid);
    assert!(license.is_expired());

    let cached = FileCache::new(dir.path()).load().unwrap().unwrap();
    assert_eq!(cached, license);
    assert_eq!(client.license().await, Some(license));
}

#[tokio::test]
async fn not_yet_valid_license_is_invalid() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let client = Client::new(client_config(pk, dir.path())).unwrap();

    let now = Utc::now();
    let payload = payload_between(Some(now + Duration::days(1)), Some(now + Duration::days(30)));
    let license = client
        .validate(Some(&sign_payload(&sk, &payload)))
        .await
        .unwrap();
    assert!(!license.valid);
}

#[tokio::test]
async fn license_without_dates_is_valid() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let client = Client::new(client_config(pk, dir.path())).unwrap();

    let license = client
        .validate(Some(&sign_payload(&sk, &payload_between(None, None))))
        .await
        .unwrap();
    assert!(license.valid);
    assert!(license.time_remaining().is_none());
}

// ── Verification failures & cache fallback ───────────────────────

#[tokio::test]
async fn corrupted_signature_without_cache_fails() {
    let (sk, pk) = test_keypair();
    let client = Client::new(ClientConfig::new().with_verifying_key(pk).without_cache()).unwrap();

    let err = client
        .validate(Some(&corrupt_signature(&active_token(&sk))))
        .await
        .unwrap_err();
    assert!(err.is(ErrorCode::InvalidLicenseSignature));
    assert!(client.license().await.is_none());
}

#[tokio::test]
async fn malformed_token_without_cache_is_decode_error() {
    let (_, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let client = Client::new(client_config(pk, dir.path())).unwrap();

    let err = client.validate(Some("definitely-not-a-token")).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::LicenseDecodeError));
}

#[tokio::test]
async fn verification_failure_falls_back_to_cache() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let client = Client::new(client_config(pk, dir.path())).unwrap();

    let good = client.validate(Some(&active_token(&sk))).await.unwrap();

    let (other_sk, _) = other_keypair();
    let foreign = active_token(&other_sk);
    let fallback = client.validate(Some(&foreign)).await.unwrap();
    assert_eq!(fallback, good);

    // The fallback is not committed.
    assert_eq!(client.signed_token().await, Some(good.signed_token.clone()));
}

#[tokio::test]
async fn fresh_client_falls_back_to_previous_session_cache() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();

    let first = Client::new(client_config(pk, dir.path())).unwrap();
    let good = first.validate(Some(&active_token(&sk))).await.unwrap();
    first.close().await.unwrap();

    let second = Client::new(client_config(pk, dir.path())).unwrap();
    let license = second
        .validate(Some(&corrupt_signature(&active_token(&sk))))
        .await
        .unwrap();
    assert_eq!(license, good);
}

// ── Token resolution ─────────────────────────────────────────────

#[tokio::test]
async fn no_token_anywhere() {
    let (_, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let client = Client::new(client_config(pk, dir.path())).unwrap();

    let err = client.validate(None).await.unwrap_err();
    assert!(matches!(err, LicenseError::NoToken));

    let err = client.validate(Some("")).await.unwrap_err();
    assert!(matches!(err, LicenseError::NoToken));
}

#[tokio::test]
async fn no_public_key() {
    let (sk, _) = test_keypair();
    let client = Client::new(ClientConfig::new().without_cache()).unwrap();
    let err = client.validate(Some(&active_token(&sk))).await.unwrap_err();
    assert!(matches!(err, LicenseError::NoPublicKey));
}

#[tokio::test]
async fn configured_token_is_used_by_default() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let token = active_token(&sk);
    let client = Client::new(client_config(pk, dir.path()).with_token(token.clone())).unwrap();

    let license = client.validate(None).await.unwrap();
    assert!(license.valid);
    assert_eq!(license.signed_token, token);
}

#[tokio::test]
async fn stored_token_takes_priority_over_configured() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let configured = expired_token(&sk);
    let client = Client::new(client_config(pk, dir.path()).with_token(configured)).unwrap();

    let explicit = active_token(&sk);
    client.validate(Some(&explicit)).await.unwrap();

    let license = client.validate(None).await.unwrap();
    assert!(license.valid);
    assert_eq!(license.signed_token, explicit);
}

// ── validate_from_cache ──────────────────────────────────────────

#[tokio::test]
async fn validate_from_cache_without_entry() {
    let (_, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let client = Client::new(client_config(pk, dir.path())).unwrap();

    let err = client.validate_from_cache().await.unwrap_err();
    assert!(matches!(err, LicenseError::NoCachedLicense));
}

#[tokio::test]
async fn validate_from_cache_commits_without_rechecking() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();

    // Cache a license whose token is no longer verifiable by the new client.
    let mut stale = Client::new(client_config(pk, dir.path()))
        .unwrap()
        .validate(Some(&active_token(&sk)))
        .await
        .unwrap();
    stale.valid = true;
    stale.license_id = "lic_cached".to_string();
    FileCache::new(dir.path()).save(&stale).unwrap();

    let (_, unrelated_pk) = other_keypair();
    let client = Client::new(client_config(unrelated_pk, dir.path())).unwrap();
    let license = client.validate_from_cache().await.unwrap();

    assert_eq!(license.license_id, "lic_cached");
    assert_eq!(client.license().await, Some(license.clone()));
    assert_eq!(client.signed_token().await, Some(license.signed_token));
}

// ── Closed client ────────────────────────────────────────────────

#[tokio::test]
async fn closed_client_rejects_validation() {
    let (sk, pk) = test_keypair();
    let dir = TempDir::new().unwrap();
    let client = Client::new(client_config(pk, dir.path())).unwrap();

    client.close().await.unwrap();
    client.close().await.unwrap();
    assert!(client.is_closed().await);

    let err = client.validate(Some(&active_token(&sk))).await.unwrap_err();
    assert!(matches!(err, LicenseError::ClientClosed));
    let err = client.validate_from_cache().await.unwrap_err();
    assert!(matches!(err, LicenseError::ClientClosed));
}

// ── Configuration ────────────────────────────────────────────────

#[test]
fn config_rejects_bad_public_key() {
    let err = ClientConfig::new().with_public_key("short").unwrap_err();
    assert!(err.is(ErrorCode::PubKeyDecodeError));
}

#[test]
fn config_defaults() {
    let cfg = ClientConfig::default();
    assert_eq!(cfg.http_timeout, std::time::Duration::from_secs(10));
    assert_eq!(cfg.heartbeat_interval, std::time::Duration::from_secs(30));
    assert_eq!(cfg.renew_before, std::time::Duration::from_secs(7 * 24 * 60 * 60));
    assert!(!cfg.disable_auto_renew);
    assert!(cfg.user_agent.starts_with("LicenseEdictSDK-Rust/"));
}

#[test]
fn instance_id_is_generated_once() {
    let client = Client::new(ClientConfig::new().without_cache()).unwrap();
    assert!(!client.instance_id().is_empty());
    assert_eq!(client.clone().instance_id(), client.instance_id());

    let named = Client::new(ClientConfig::new().without_cache().with_instance_id("node-1")).unwrap();
    assert_eq!(named.instance_id(), "node-1");
}
