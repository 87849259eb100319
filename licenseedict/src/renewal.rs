//! Exchanging the current token for a fresh one.

use crate::client::Client;
use crate::error::{ErrorCode, LicenseError, LicenseResult, ValidationError};
use crate::events::{Event, EventData, EventType, RenewalResult};
use crate::license::License;
use serde_json::json;
use tracing::{debug, info};

/// Renewal endpoint, relative to the server URL.
pub const RENEW_PATH: &str = "/api/v1/licenses/renew";

impl Client {
    /// Renews the license through the server and returns the new license.
    ///
    /// The new token is fully re-validated. If that is not possible (no public
    /// key) or does not yield a valid license, a placeholder license carrying
    /// only the new token is returned and the token is stored for later use.
    ///
    /// # Errors
    ///
    /// `NoServerUrl`, `NoToken`, `ClientClosed`, or `RenewalFailed` when the
    /// request fails or the server refuses.
    pub async fn renew(&self) -> LicenseResult<License> {
        let result = self.request_renewal().await?;

        if let Some(license) = self.revalidate_renewed(&result).await {
            return Ok(license);
        }

        if !result.signed_token.is_empty() {
            self.inner.state.write().await.signed_token = Some(result.signed_token.clone());
        }
        Ok(License::from_token(result.signed_token))
    }

    /// Renews the license and returns the server's raw renewal response.
    ///
    /// Re-validates the new token like [`Client::renew`] but does not return
    /// the re-validated license.
    ///
    /// # Errors
    ///
    /// Same as [`Client::renew`].
    pub async fn renew_result(&self) -> LicenseResult<RenewalResult> {
        let result = self.request_renewal().await?;
        self.revalidate_renewed(&result).await;
        Ok(result)
    }

    async fn request_renewal(&self) -> LicenseResult<RenewalResult> {
        self.ensure_open().await?;
        let server_url = self
            .resolve_server_url()
            .await
            .ok_or(LicenseError::NoServerUrl)?;
        let token = self.current_token().await.ok_or(LicenseError::NoToken)?;

        let url = format!("{server_url}{RENEW_PATH}");
        let body = json!({ "signed_token": token });

        let response = self.inner.transport.post(&url, &body).await.map_err(|e| {
            ValidationError::with_source(ErrorCode::RenewalFailed, "renewal request failed", e)
        })?;

        if !response.is_success() {
            let mut message = format!("renewal returned status {}", response.status);
            if let Some(status) = response.body.get("status").and_then(|s| s.as_str()) {
                message.push_str(&format!(" ({status})"));
            }
            return Err(ValidationError::new(ErrorCode::RenewalFailed, message).into());
        }

        if response.body.is_null() {
            return Ok(RenewalResult::default());
        }
        let result: RenewalResult = serde_json::from_value(response.body).map_err(|e| {
            ValidationError::with_source(
                ErrorCode::RenewalFailed,
                "failed to decode renewal response",
                e,
            )
        })?;
        debug!("renewal accepted, new expiry {}", result.expires_at);
        Ok(result)
    }

    /// Re-validates a renewed token; emits `LicenseRenewed` when it yields a
    /// valid license.
    async fn revalidate_renewed(&self, result: &RenewalResult) -> Option<License> {
        if result.signed_token.is_empty() || self.inner.config.public_key.is_none() {
            return None;
        }

        match self.validate(Some(&result.signed_token)).await {
            Ok(license) if license.valid => {
                info!("license {} renewed", license.license_id);
                self.inner.events.emit(
                    Event::new(EventType::LicenseRenewed, "license renewed")
                        .with_data(EventData::Renewal(result.clone())),
                );
                Some(license)
            }
            Ok(_) => {
                debug!("renewed token did not yield a valid license");
                None
            }
            Err(e) => {
                debug!("renewed token failed validation: {e}");
                None
            }
        }
    }
}
