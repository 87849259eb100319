//! Client runtime for LicenseEdict signed license tokens.
//!
//! This crate handles:
//! - Ed25519 verification of signed tokens
//! - Offline-first validation with a last-known-good cache
//! - Automatic renewal shortly before expiry
//! - Seat heartbeats and checkout for concurrency-limited licenses
//! - Best-effort lifecycle events for the host application
//!
//! # Offline-first
//!
//! Validation never blocks the host on a degraded answer: a signature failure
//! falls back to the cached license, and an expired or not-yet-valid license
//! is returned with `valid == false` rather than as an error.
//!
//! # Token format
//!
//! `base64(signature[64] || payload_json)`, signed over the payload bytes.
//!
//! # Usage
//!
//! ```no_run
//! use licenseedict::{Client, ClientConfig};
//!
//! # async fn run(public_key: &str, token: &str) -> licenseedict::LicenseResult<()> {
//! let config = ClientConfig::new()
//!     .with_public_key(public_key)?
//!     .with_app_info("MyApp", "MyCompany");
//! let client = Client::new(config)?;
//!
//! let license = client.validate(Some(token)).await?;
//! if license.valid && license.has_feature("PRO") {
//!     // ...
//! }
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod check;
mod client;
mod config;
mod device;
mod error;
mod events;
mod heartbeat;
mod license;
mod renewal;
mod token;
mod transport;
mod validate;

pub use cache::{CACHE_FILE_NAME, CacheStore, DisabledCache, FileCache, default_cache_dir};
pub use check::{check_feature, check_license, check_license_with_cache, check_license_with_key};
pub use client::Client;
pub use config::{ClientConfig, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_RENEW_BEFORE, RenewCallback};
pub use device::{DeviceFingerprint, DeviceInfo};
pub use error::{ErrorCode, LicenseError, LicenseResult, ValidationError};
pub use events::{
    EVENTS_CHANNEL_SIZE, Event, EventData, EventType, HeartbeatStatus, RenewalResult,
};
pub use heartbeat::{CHECKOUT_PATH, HEARTBEAT_PATH, HeartbeatOptions, STATUS_TOO_MANY_REQUESTS};
pub use license::License;
pub use renewal::RENEW_PATH;
pub use token::{
    PUBLIC_KEY_SIZE, SIGNATURE_SIZE, TokenPayload, decode_public_key, decode_unverified,
    verify_token,
};
pub use transport::{
    DEFAULT_HTTP_TIMEOUT, DEFAULT_USER_AGENT, HttpTransport, Transport, TransportError,
    TransportResponse,
};

pub use ed25519_dalek::VerifyingKey;
