//! The trusted, user-facing license record.

use crate::token::{TokenPayload, optional_time};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A license decoded from a verified token (or restored from cache).
///
/// `valid` is derived from the checks that produced the record. A `License`
/// is always replaced wholesale, never mutated piecemeal by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct License {
    /// True if the signature verified and no temporal check failed.
    pub valid: bool,
    /// License identifier.
    pub license_id: String,
    /// Product identifier.
    pub product_id: String,
    /// Human-facing license key.
    pub license_key: String,
    /// Licensee name.
    pub licensee: String,
    /// Plan name.
    pub plan: String,
    /// Enabled feature flags.
    pub features: BTreeSet<String>,
    /// Maximum concurrent seats.
    pub max_seats: u32,
    /// Issued-at timestamp.
    #[serde(with = "optional_time")]
    pub issued_at: Option<DateTime<Utc>>,
    /// Expiry timestamp, or None if the license never expires.
    #[serde(with = "optional_time")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Licensing server base URL carried by the token.
    pub server_url: Option<String>,
    /// The signed token this license was decoded from.
    pub signed_token: String,
}

impl License {
    /// Builds a license from a verified payload, initially marked valid.
    #[must_use]
    pub fn from_payload(payload: TokenPayload, signed_token: impl Into<String>) -> Self {
        Self {
            valid: true,
            license_id: payload.license_id,
            product_id: payload.product_id,
            license_key: payload.license_key,
            licensee: payload.licensee,
            plan: payload.plan,
            features: payload.features,
            max_seats: payload.max_seats,
            issued_at: payload.issued_at,
            expires_at: payload.expires_at,
            server_url: payload.server_url.filter(|u| !u.is_empty()),
            signed_token: signed_token.into(),
        }
    }

    /// A placeholder license carrying only a signed token, used when a renewed
    /// token could not be re-validated locally.
    #[must_use]
    pub fn from_token(signed_token: impl Into<String>) -> Self {
        Self {
            signed_token: signed_token.into(),
            ..Self::default()
        }
    }

    /// Applies the not-before and expiry checks at `now`.
    ///
    /// Each check can only clear `valid`, never set it.
    pub fn apply_temporal_checks(&mut self, now: DateTime<Utc>) {
        if self.issued_at.is_some_and(|iat| now < iat) {
            self.valid = false;
        }
        if self.expires_at.is_some_and(|exp| now > exp) {
            self.valid = false;
        }
    }

    /// Returns true if the license includes the named feature.
    #[must_use]
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Returns true if the license has an expiry that has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Utc::now() > exp)
    }

    /// Time left until expiry; None for non-expiring licenses.
    /// Negative once expired.
    #[must_use]
    pub fn time_remaining(&self) -> Option<chrono::Duration> {
        self.expires_at.map(|exp| exp - Utc::now())
    }
}

