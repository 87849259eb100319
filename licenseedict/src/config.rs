//! Client configuration.

use crate::cache::{CacheStore, DisabledCache, FileCache};
use crate::error::LicenseResult;
use crate::license::License;
use crate::token::decode_public_key;
use crate::transport::{DEFAULT_HTTP_TIMEOUT, DEFAULT_USER_AGENT, HttpTransport, Transport};
use ed25519_dalek::VerifyingKey;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Default auto-renewal threshold (7 days before expiry).
pub const DEFAULT_RENEW_BEFORE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Callback invoked with the new license after a successful auto-renewal.
pub type RenewCallback = Arc<dyn Fn(&License) + Send + Sync>;

/// Configuration for a [`Client`](crate::Client).
#[derive(Clone)]
pub struct ClientConfig {
    /// Ed25519 key used to verify signed tokens.
    pub public_key: Option<VerifyingKey>,
    /// Token used by `validate(None)` when nothing else is stored.
    pub token: Option<String>,
    /// Explicit server URL; overrides the one carried by the token.
    pub server_url: Option<String>,
    /// Application name, used for the default cache directory.
    pub app_name: String,
    /// Application publisher, used for the default cache directory.
    pub app_publisher: String,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// Cache directory override.
    pub cache_dir: Option<PathBuf>,
    /// Disables license caching entirely.
    pub disable_cache: bool,
    /// Disables all server communication initiated automatically.
    pub offline_only: bool,
    /// User-Agent sent with every request.
    pub user_agent: String,
    /// Instance ID for seat tracking; a random one is generated when unset.
    pub instance_id: Option<String>,
    /// Initial heartbeat interval.
    pub heartbeat_interval: Duration,
    /// Auto-renew when this much time or less is left before expiry.
    pub renew_before: Duration,
    /// Disables automatic renewal.
    pub disable_auto_renew: bool,
    /// Called after a successful auto-renewal.
    pub on_renew: Option<RenewCallback>,
    /// Custom transport; an [`HttpTransport`] is built when unset.
    pub transport: Option<Arc<dyn Transport>>,
    /// Custom cache store; takes precedence over the cache settings above.
    pub cache: Option<Arc<dyn CacheStore>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            public_key: None,
            token: None,
            server_url: None,
            app_name: String::new(),
            app_publisher: String::new(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            cache_dir: None,
            disable_cache: false,
            offline_only: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            instance_id: None,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            renew_before: DEFAULT_RENEW_BEFORE,
            disable_auto_renew: false,
            on_renew: None,
            transport: None,
            cache: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("has_public_key", &self.public_key.is_some())
            .field("has_token", &self.token.is_some())
            .field("server_url", &self.server_url)
            .field("app_name", &self.app_name)
            .field("app_publisher", &self.app_publisher)
            .field("http_timeout", &self.http_timeout)
            .field("cache_dir", &self.cache_dir)
            .field("disable_cache", &self.disable_cache)
            .field("offline_only", &self.offline_only)
            .field("user_agent", &self.user_agent)
            .field("instance_id", &self.instance_id)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("renew_before", &self.renew_before)
            .field("disable_auto_renew", &self.disable_auto_renew)
            .field("has_on_renew", &self.on_renew.is_some())
            .field("custom_transport", &self.transport.is_some())
            .field("custom_cache", &self.cache.is_some())
            .finish()
    }
}

impl ClientConfig {
    /// Creates a configuration with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the verification key from its standard-base64 form.
    ///
    /// # Errors
    ///
    /// Returns `PubKeyDecodeError` if the key is malformed.
    pub fn with_public_key(mut self, encoded: &str) -> LicenseResult<Self> {
        self.public_key = Some(decode_public_key(encoded)?);
        Ok(self)
    }

    /// Sets an already decoded verification key.
    #[must_use]
    pub fn with_verifying_key(mut self, key: VerifyingKey) -> Self {
        self.public_key = Some(key);
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Sets the application name and publisher for cache directory naming.
    #[must_use]
    pub fn with_app_info(mut self, name: impl Into<String>, publisher: impl Into<String>) -> Self {
        self.app_name = name.into();
        self.app_publisher = publisher.into();
        self
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.disable_cache = true;
        self
    }

    /// Disables auto-renewal traffic; explicit calls still reach the server.
    #[must_use]
    pub fn offline_only(mut self) -> Self {
        self.offline_only = true;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    #[must_use]
    pub fn with_renew_before(mut self, threshold: Duration) -> Self {
        self.renew_before = threshold;
        self
    }

    #[must_use]
    pub fn without_auto_renew(mut self) -> Self {
        self.disable_auto_renew = true;
        self
    }

    /// Registers a callback invoked after a successful auto-renewal.
    #[must_use]
    pub fn with_on_renew<F>(mut self, callback: F) -> Self
    where
        F: Fn(&License) + Send + Sync + 'static,
    {
        self.on_renew = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn with_cache_store(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Heartbeat interval a new session starts with; zero means the default.
    pub(crate) fn initial_heartbeat_interval(&self) -> Duration {
        if self.heartbeat_interval.is_zero() {
            DEFAULT_HEARTBEAT_INTERVAL
        } else {
            self.heartbeat_interval
        }
    }

    /// Auto-renewal threshold; zero means the default.
    pub(crate) fn renewal_threshold(&self) -> Duration {
        if self.renew_before.is_zero() {
            DEFAULT_RENEW_BEFORE
        } else {
            self.renew_before
        }
    }

    pub(crate) fn build_cache(&self) -> Arc<dyn CacheStore> {
        if let Some(cache) = &self.cache {
            return Arc::clone(cache);
        }
        if self.disable_cache {
            return Arc::new(DisabledCache);
        }
        match &self.cache_dir {
            Some(dir) => Arc::new(FileCache::new(dir)),
            None => Arc::new(FileCache::for_app(&self.app_name, &self.app_publisher)),
        }
    }

    pub(crate) fn build_transport(&self) -> LicenseResult<Arc<dyn Transport>> {
        if let Some(transport) = &self.transport {
            return Ok(Arc::clone(transport));
        }
        let http = HttpTransport::new(self.http_timeout, &self.user_agent)?;
        Ok(Arc::new(http))
    }
}
