//! One-shot license checks without a [`Client`](crate::Client).
//!
//! These share the client's validation rules (verify, temporal checks, cache
//! fallback, cache write) but never talk to the server.

use crate::cache::{CacheStore, FileCache};
use crate::error::{LicenseError, LicenseResult};
use crate::license::License;
use crate::token::decode_public_key;
use crate::validate::evaluate_token;
use chrono::Utc;
use ed25519_dalek::VerifyingKey;
use tracing::{info, warn};

/// Checks a token against a standard-base64 public key.
///
/// Uses the default (app-less) cache location. A non-`valid` license is not
/// an error; check [`License::valid`].
///
/// # Errors
///
/// `NoPublicKey`, `NoToken`, `PubKeyDecodeError`, or the verifier's error when
/// no cached license is available.
pub fn check_license(public_key: &str, token: &str) -> LicenseResult<License> {
    if public_key.is_empty() {
        return Err(LicenseError::NoPublicKey);
    }
    if token.is_empty() {
        return Err(LicenseError::NoToken);
    }
    let key = decode_public_key(public_key)?;
    check_license_with_cache(&key, token, &FileCache::for_app("", ""))
}

/// Checks a token with an already decoded key, caching under the
/// application's directory.
///
/// # Errors
///
/// Same as [`check_license`].
pub fn check_license_with_key(
    token: &str,
    public_key: &VerifyingKey,
    app_name: &str,
    app_publisher: &str,
) -> LicenseResult<License> {
    if token.is_empty() {
        return Err(LicenseError::NoToken);
    }
    check_license_with_cache(public_key, token, &FileCache::for_app(app_name, app_publisher))
}

/// Checks a token using an explicit cache store.
///
/// # Errors
///
/// The verifier's error when verification fails and `cache` is empty.
pub fn check_license_with_cache(
    public_key: &VerifyingKey,
    token: &str,
    cache: &dyn CacheStore,
) -> LicenseResult<License> {
    let license = match evaluate_token(public_key, token, Utc::now()) {
        Ok(license) => license,
        Err(err) => {
            if let Ok(Some(cached)) = cache.load() {
                info!("token rejected ({err}), using cached license");
                return Ok(cached);
            }
            return Err(err.into());
        }
    };

    if let Err(e) = cache.save(&license) {
        warn!("failed to cache license: {e}");
    }
    Ok(license)
}

/// Returns true if the token's license includes `feature`.
///
/// # Errors
///
/// Same as [`check_license`].
pub fn check_feature(public_key: &str, token: &str, feature: &str) -> LicenseResult<bool> {
    let license = check_license(public_key, token)?;
    Ok(license.has_feature(feature))
}
