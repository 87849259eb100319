//! The license client: shared state, construction and shutdown.
//!
//! Validation, renewal and heartbeat operations live in their own modules as
//! further `impl Client` blocks.

use crate::cache::CacheStore;
use crate::config::ClientConfig;
use crate::error::{LicenseError, LicenseResult};
use crate::events::{EVENTS_CHANNEL_SIZE, Event, EventBus};
use crate::heartbeat::HeartbeatState;
use crate::license::License;
use crate::transport::Transport;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::info;
use uuid::Uuid;

/// License and token are only ever replaced together, under one write lock.
#[derive(Debug, Default)]
pub(crate) struct ClientState {
    pub(crate) license: Option<License>,
    pub(crate) signed_token: Option<String>,
    /// Server URL adopted from the first validated token that carried one.
    pub(crate) adopted_server_url: Option<String>,
    pub(crate) closed: bool,
}

pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) cache: Arc<dyn CacheStore>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) state: RwLock<ClientState>,
    /// Heartbeat control; kept apart from `state` so heartbeat start/stop never
    /// blocks validation.
    pub(crate) heartbeat: Mutex<HeartbeatState>,
    /// Current heartbeat interval in milliseconds, adapted by server responses.
    pub(crate) heartbeat_interval_ms: Arc<AtomicU64>,
    pub(crate) instance_id: String,
    pub(crate) events: Arc<EventBus>,
}

/// Holds, verifies, renews and reports on one license token lineage.
///
/// Cloning is cheap; clones share the same state. Call [`Client::close`]
/// when done so the heartbeat loop is stopped and the event stream ends.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

impl Client {
    /// Creates a client from `config`.
    ///
    /// # Errors
    ///
    /// Fails only if the default HTTP transport cannot be built.
    pub fn new(config: ClientConfig) -> LicenseResult<Self> {
        let cache = config.build_cache();
        let transport = config.build_transport()?;
        let instance_id = config
            .instance_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let interval = config.initial_heartbeat_interval();

        let state = ClientState {
            signed_token: config.token.clone().filter(|t| !t.is_empty()),
            ..ClientState::default()
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                cache,
                transport,
                state: RwLock::new(state),
                heartbeat: Mutex::new(HeartbeatState::default()),
                heartbeat_interval_ms: Arc::new(AtomicU64::new(duration_millis(interval))),
                instance_id,
                events: Arc::new(EventBus::new(EVENTS_CHANNEL_SIZE)),
            }),
        })
    }

    /// Returns the configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the instance ID used for seat tracking.
    #[must_use]
    pub fn instance_id(&self) -> &str {
        &self.inner.instance_id
    }

    /// Returns the most recently committed license, if any.
    pub async fn license(&self) -> Option<License> {
        self.inner.state.read().await.license.clone()
    }

    /// Returns the current signed token, if any.
    pub async fn signed_token(&self) -> Option<String> {
        self.current_token().await
    }

    /// Returns true once [`Client::close`] has run.
    pub async fn is_closed(&self) -> bool {
        self.inner.state.read().await.closed
    }

    /// Takes the receiving end of the event stream.
    ///
    /// Only the first call returns `Some`. Events are best effort: if the
    /// buffer is full when an event is produced, that event is dropped.
    pub fn take_events(&self) -> Option<mpsc::Receiver<Event>> {
        self.inner.events.take_receiver()
    }

    /// Stops the heartbeat and ends the event stream.
    ///
    /// Does not check out the seat; it expires on the server by TTL.
    /// Calling `close` more than once is a no-op.
    pub async fn close(&self) -> LicenseResult<()> {
        {
            let mut state = self.inner.state.write().await;
            if state.closed {
                return Ok(());
            }
            state.closed = true;
        }
        self.stop_heartbeat().await;
        self.inner.events.close();
        info!("license client closed");
        Ok(())
    }

    pub(crate) async fn ensure_open(&self) -> LicenseResult<()> {
        if self.is_closed().await {
            return Err(LicenseError::ClientClosed);
        }
        Ok(())
    }

    /// Stored token first, then the configured default.
    pub(crate) async fn current_token(&self) -> Option<String> {
        let stored = self.inner.state.read().await.signed_token.clone();
        stored
            .or_else(|| self.inner.config.token.clone())
            .filter(|t| !t.is_empty())
    }

    /// Configured URL, then the adopted one, then the current license's.
    pub(crate) async fn resolve_server_url(&self) -> Option<String> {
        let url = match self.inner.config.server_url.clone().filter(|u| !u.is_empty()) {
            Some(url) => Some(url),
            None => {
                let state = self.inner.state.read().await;
                state
                    .adopted_server_url
                    .clone()
                    .or_else(|| state.license.as_ref().and_then(|l| l.server_url.clone()))
            }
        };
        url.map(|u| u.trim_end_matches('/').to_string())
    }

    /// Replaces license and token as one unit.
    pub(crate) async fn commit(&self, license: License, token: String) {
        let mut state = self.inner.state.write().await;
        if self.inner.config.server_url.is_none() && state.adopted_server_url.is_none() {
            state.adopted_server_url = license.server_url.clone();
        }
        state.license = Some(license);
        state.signed_token = Some(token);
    }
}

pub(crate) fn duration_millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
