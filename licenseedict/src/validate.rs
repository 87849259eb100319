//! Offline-first validation: verify, apply temporal rules, fall back to the
//! cache, commit, and decide whether to renew in the background.

use crate::client::Client;
use crate::error::{LicenseError, LicenseResult, ValidationError};
use crate::license::License;
use crate::token::verify_token;
use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use tracing::{debug, info, warn};

/// Verifies `token` and applies the temporal checks at `now`.
///
/// A temporally invalid license is returned with `valid == false`, not as an
/// error.
pub(crate) fn evaluate_token(
    public_key: &VerifyingKey,
    token: &str,
    now: DateTime<Utc>,
) -> Result<License, ValidationError> {
    let payload = verify_token(public_key, token)?;
    let mut license = License::from_payload(payload, token);
    license.apply_temporal_checks(now);
    Ok(license)
}

impl Client {
    /// Validates a signed token and commits the result.
    ///
    /// The token is taken from `token`, else the stored token, else the
    /// configured default. On a verification failure the last cached license
    /// is returned instead, if there is one.
    ///
    /// A license that fails a temporal check comes back with `valid == false`
    /// and no error; always check [`License::valid`].
    ///
    /// # Errors
    ///
    /// - `ClientClosed`, `NoToken` or `NoPublicKey` for precondition failures.
    /// - The verifier's `ValidationError` when no cached license exists.
    pub async fn validate(&self, token: Option<&str>) -> LicenseResult<License> {
        let token = {
            let state = self.inner.state.read().await;
            if state.closed {
                return Err(LicenseError::ClientClosed);
            }
            token
                .filter(|t| !t.is_empty())
                .map(str::to_owned)
                .or_else(|| state.signed_token.clone())
                .or_else(|| self.inner.config.token.clone())
                .filter(|t| !t.is_empty())
                .ok_or(LicenseError::NoToken)?
        };

        let public_key = self
            .inner
            .config
            .public_key
            .as_ref()
            .ok_or(LicenseError::NoPublicKey)?;

        let license = match evaluate_token(public_key, &token, Utc::now()) {
            Ok(license) => license,
            Err(err) => {
                match self.inner.cache.load() {
                    Ok(Some(cached)) => {
                        info!("token rejected ({err}), using cached license");
                        return Ok(cached);
                    }
                    Ok(None) => {}
                    Err(e) => debug!("cache unavailable: {e}"),
                }
                return Err(err.into());
            }
        };

        self.commit(license.clone(), token).await;

        if let Err(e) = self.inner.cache.save(&license) {
            warn!("failed to cache license: {e}");
        }

        self.maybe_auto_renew(&license);

        Ok(license)
    }

    /// Commits the cached license without verification or temporal checks.
    ///
    /// # Errors
    ///
    /// Returns `ClientClosed`, `NoCachedLicense`, or a cache read error.
    pub async fn validate_from_cache(&self) -> LicenseResult<License> {
        self.ensure_open().await?;

        let cached = self
            .inner
            .cache
            .load()?
            .ok_or(LicenseError::NoCachedLicense)?;

        let mut state = self.inner.state.write().await;
        if state.closed {
            return Err(LicenseError::ClientClosed);
        }
        if !cached.signed_token.is_empty() {
            state.signed_token = Some(cached.signed_token.clone());
        }
        state.license = Some(cached.clone());
        Ok(cached)
    }

    /// Launches a background renewal when the license is close to expiry.
    ///
    /// Failures are discarded; the next `validate` re-evaluates. Concurrent
    /// validations near the threshold may each launch a renewal.
    fn maybe_auto_renew(&self, license: &License) {
        let config = &self.inner.config;
        if config.disable_auto_renew || config.offline_only || !license.valid {
            return;
        }
        let Some(remaining) = license.time_remaining() else {
            return;
        };
        let threshold = chrono::Duration::from_std(config.renewal_threshold())
            .unwrap_or(chrono::Duration::MAX);
        if remaining > threshold {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, skipping auto-renewal");
            return;
        };

        info!(
            "license {} expires in {}s, renewing in background",
            license.license_id,
            remaining.num_seconds()
        );
        let client = self.clone();
        runtime.spawn(async move {
            match client.renew().await {
                Ok(renewed) => {
                    if let Some(on_renew) = &client.inner.config.on_renew {
                        on_renew(&renewed);
                    }
                }
                Err(e) => debug!("auto-renewal failed: {e}"),
            }
        });
    }
}
