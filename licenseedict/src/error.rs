//! Error types for the licensing client.
//!
//! Failures that carry a stable machine-readable code are [`ValidationError`]s.
//! Everything else (missing configuration, closed client, heartbeat state) is
//! an ambient [`LicenseError`] variant.

use crate::transport::TransportError;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Stable failure codes. The code is the contract; message text is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Token or payload could not be decoded.
    LicenseDecodeError,
    /// Public key is malformed or has the wrong length.
    PubKeyDecodeError,
    /// Ed25519 signature did not verify.
    InvalidLicenseSignature,
    /// The license is not valid yet.
    LicenseNotValidBefore,
    /// The license has expired.
    LicenseNotValidAfter,
    /// The server reported the license as revoked.
    LicenseRevoked,
    /// The server could not be reached or answered with a failure status.
    ServerUnreachable,
    /// No seats are left on the license.
    SeatLimitReached,
    /// Token renewal was refused or failed.
    RenewalFailed,
}

impl ErrorCode {
    /// Returns the wire/string form of the code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LicenseDecodeError => "LICENSE_DECODE_ERROR",
            Self::PubKeyDecodeError => "PUBKEY_DECODE_ERROR",
            Self::InvalidLicenseSignature => "INVALID_LICENSE_SIGNATURE",
            Self::LicenseNotValidBefore => "LICENSE_NOT_VALID_BEFORE",
            Self::LicenseNotValidAfter => "LICENSE_NOT_VALID_AFTER",
            Self::LicenseRevoked => "LICENSE_REVOKED",
            Self::ServerUnreachable => "SERVER_UNREACHABLE",
            Self::SeatLimitReached => "SEAT_LIMIT_REACHED",
            Self::RenewalFailed => "RENEWAL_FAILED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coded validation failure with an optional underlying cause.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ValidationError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl ValidationError {
    /// Creates an error without a wrapped cause.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    pub fn with_source<E>(code: ErrorCode, message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the failure code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Returns the human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true if this error carries `code`.
    #[must_use]
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }
}

/// Licensing client errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// A coded validation, renewal or server failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No verification key configured.
    #[error("no public key configured")]
    NoPublicKey,

    /// No signed token was supplied, stored or configured.
    #[error("no signed token provided")]
    NoToken,

    /// Neither the configuration nor the validated license names a server.
    #[error("no server URL available")]
    NoServerUrl,

    /// The client has been closed.
    #[error("client is closed")]
    ClientClosed,

    /// A heartbeat loop is already active on this client.
    #[error("heartbeat already running")]
    AlreadyRunning,

    /// No heartbeat loop is active.
    #[error("heartbeat not running")]
    NotRunning,

    /// No cached license is available.
    #[error("no cached license")]
    NoCachedLicense,

    /// Cache storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// HTTP transport setup error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LicenseError {
    /// Returns the stable failure code, if this error has one.
    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Validation(e) => Some(e.code()),
            _ => None,
        }
    }

    /// Returns true if this error carries `code`.
    #[must_use]
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code() == Some(code)
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
