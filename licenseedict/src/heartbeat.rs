//! Seat heartbeats and checkout.
//!
//! At most one heartbeat loop runs per client. The loop sends one heartbeat
//! immediately, then one per interval; the server may change the interval in
//! its response. Stopping is a rendezvous: [`Client::stop_heartbeat`] returns
//! only after the loop has finished any in-flight send and exited.

use crate::client::{Client, duration_millis};
use crate::device::{DeviceFingerprint, DeviceInfo};
use crate::error::{ErrorCode, LicenseError, LicenseResult, ValidationError};
use crate::events::{Event, EventBus, EventData, EventType, HeartbeatStatus};
use crate::transport::{DEFAULT_USER_AGENT, Transport};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Heartbeat endpoint, relative to the server URL.
pub const HEARTBEAT_PATH: &str = "/api/v1/concurrency/heartbeat";

/// Checkout endpoint, relative to the server URL.
pub const CHECKOUT_PATH: &str = "/api/v1/concurrency/checkout";

/// HTTP status the server uses when no seat is available.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Per-session metadata reported with each heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatOptions {
    /// Seat instance ID; falls back to the client's instance ID when empty.
    pub instance_id: String,
    pub user_hash: String,
    pub hostname: String,
    pub ip: String,
    pub user_agent: String,
}

impl HeartbeatOptions {
    /// Options prefilled with this machine's hostname, agent string and
    /// fingerprint as the user hash.
    #[must_use]
    pub fn for_this_device() -> Self {
        let info = DeviceInfo::collect();
        Self {
            user_agent: info.user_agent(DEFAULT_USER_AGENT),
            hostname: info.hostname,
            user_hash: DeviceFingerprint::generate().as_str().to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct HeartbeatState {
    running: bool,
    options: HeartbeatOptions,
    stop_tx: Option<oneshot::Sender<()>>,
    done_rx: Option<oneshot::Receiver<()>>,
}

/// Everything the background loop needs; it never touches the client itself.
struct HeartbeatWorker {
    transport: Arc<dyn Transport>,
    events: Arc<EventBus>,
    interval_ms: Arc<AtomicU64>,
    url: String,
    body: Value,
}

impl HeartbeatWorker {
    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::SeqCst))
    }

    async fn run(self, mut stop_rx: oneshot::Receiver<()>, done_tx: oneshot::Sender<()>) {
        self.send().await;

        let sleep = tokio::time::sleep(self.interval());
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                // A dropped sender (client gone) also stops the loop.
                _ = &mut stop_rx => break,
                () = &mut sleep => {
                    self.send().await;
                    sleep.as_mut().reset(Instant::now() + self.interval());
                }
            }
        }

        debug!("heartbeat loop exited");
        let _ = done_tx.send(());
    }

    async fn send(&self) {
        let response = match self.transport.post(&self.url, &self.body).await {
            Ok(response) => response,
            Err(e) => {
                warn!("heartbeat failed: {e}");
                self.events
                    .emit(Event::new(EventType::HeartbeatError, e.to_string()));
                return;
            }
        };

        let status: HeartbeatStatus = serde_json::from_value(response.body.clone())
            .unwrap_or_default();

        if response.is_success() {
            if let Some(secs) = u64::try_from(status.heartbeat_interval)
                .ok()
                .filter(|secs| *secs > 0)
            {
                let next = Duration::from_secs(secs);
                self.interval_ms.store(duration_millis(next), Ordering::SeqCst);
            }
            self.events.emit(
                Event::new(EventType::HeartbeatOk, "heartbeat accepted")
                    .with_data(EventData::Heartbeat(status)),
            );
        } else if response.status == STATUS_TOO_MANY_REQUESTS {
            warn!("heartbeat rejected: seat limit reached");
            self.events.emit(
                Event::new(EventType::HeartbeatRejected, "seat limit reached")
                    .with_data(EventData::Heartbeat(status)),
            );
        } else {
            warn!("heartbeat returned status {}", response.status);
            self.events.emit(
                Event::new(
                    EventType::HeartbeatError,
                    format!("heartbeat returned status {}", response.status),
                )
                .with_data(EventData::Heartbeat(status)),
            );
        }
    }
}

impl Client {
    /// Starts the background heartbeat loop.
    ///
    /// Listen for results on [`Client::take_events`].
    ///
    /// # Errors
    ///
    /// `ClientClosed`, `AlreadyRunning`, `NoServerUrl` or `NoToken`.
    pub async fn start_heartbeat(&self, options: Option<HeartbeatOptions>) -> LicenseResult<()> {
        let mut hb = self.inner.heartbeat.lock().await;
        // Checked under the heartbeat lock so a concurrent close cannot miss us.
        self.ensure_open().await?;
        if hb.running {
            return Err(LicenseError::AlreadyRunning);
        }

        let server_url = self
            .resolve_server_url()
            .await
            .ok_or(LicenseError::NoServerUrl)?;
        let token = self.current_token().await.ok_or(LicenseError::NoToken)?;

        // Each session starts from the configured interval, not the last one
        // the server asked for.
        self.inner.heartbeat_interval_ms.store(
            duration_millis(self.inner.config.initial_heartbeat_interval()),
            Ordering::SeqCst,
        );

        let mut options = options.unwrap_or_default();
        if options.instance_id.is_empty() {
            options.instance_id = self.inner.instance_id.clone();
        }

        let worker = HeartbeatWorker {
            transport: Arc::clone(&self.inner.transport),
            events: Arc::clone(&self.inner.events),
            interval_ms: Arc::clone(&self.inner.heartbeat_interval_ms),
            url: format!("{server_url}{HEARTBEAT_PATH}"),
            body: json!({
                "signed_token": token,
                "instance_id": options.instance_id,
                "metadata": {
                    "hostname": options.hostname,
                    "ip": options.ip,
                    "user_agent": options.user_agent,
                    "user_hash": options.user_hash,
                },
            }),
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();

        info!(
            "starting heartbeat for instance {} every {:?}",
            options.instance_id,
            worker.interval()
        );

        hb.running = true;
        hb.options = options;
        hb.stop_tx = Some(stop_tx);
        hb.done_rx = Some(done_rx);

        tokio::spawn(worker.run(stop_rx, done_tx));
        Ok(())
    }

    /// Stops the heartbeat loop and waits for it to exit.
    ///
    /// No heartbeat is in flight and no further heartbeat events are produced
    /// once this returns. A no-op if no loop is running. The wait is bounded
    /// only by the transport timeout of an in-flight send.
    pub async fn stop_heartbeat(&self) {
        let mut hb = self.inner.heartbeat.lock().await;
        if !hb.running {
            return;
        }

        if let Some(stop_tx) = hb.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(done_rx) = hb.done_rx.take() {
            // Err means the loop task ended without signalling; either way it is gone.
            let _ = done_rx.await;
        }
        hb.running = false;
        info!("heartbeat stopped");
    }

    /// Returns true while a heartbeat loop is active.
    pub async fn is_heartbeat_running(&self) -> bool {
        self.inner.heartbeat.lock().await.running
    }

    /// Returns the interval the running heartbeat loop will wait next.
    ///
    /// # Errors
    ///
    /// `NotRunning` if no heartbeat is active.
    pub async fn heartbeat_interval(&self) -> LicenseResult<Duration> {
        if !self.is_heartbeat_running().await {
            return Err(LicenseError::NotRunning);
        }
        Ok(Duration::from_millis(
            self.inner.heartbeat_interval_ms.load(Ordering::SeqCst),
        ))
    }

    /// Releases this instance's seat on the server.
    ///
    /// Stops the heartbeat first so the release cannot race a heartbeat.
    ///
    /// # Errors
    ///
    /// `ClientClosed`, `NoServerUrl`, `NoToken`, or `ServerUnreachable` for
    /// any transport failure or non-success response.
    pub async fn checkout(&self) -> LicenseResult<()> {
        self.ensure_open().await?;
        self.stop_heartbeat().await;

        let server_url = self
            .resolve_server_url()
            .await
            .ok_or(LicenseError::NoServerUrl)?;
        let token = self.current_token().await.ok_or(LicenseError::NoToken)?;

        let options = self.inner.heartbeat.lock().await.options.clone();
        let instance_id = if options.instance_id.is_empty() {
            self.inner.instance_id.clone()
        } else {
            options.instance_id
        };

        let mut body = json!({
            "signed_token": token,
            "instance_id": instance_id,
        });
        if !options.user_hash.is_empty() {
            body["user_hash"] = Value::String(options.user_hash);
        }

        let url = format!("{server_url}{CHECKOUT_PATH}");
        let response = match self.inner.transport.delete(&url, &body).await {
            Ok(response) => response,
            Err(e) => {
                self.inner.events.emit(Event::new(
                    EventType::ServerUnreachable,
                    format!("checkout failed: {e}"),
                ));
                return Err(ValidationError::with_source(
                    ErrorCode::ServerUnreachable,
                    "checkout request failed",
                    e,
                )
                .into());
            }
        };

        if !response.is_success() {
            let message = format!("checkout returned status {}", response.status);
            self.inner
                .events
                .emit(Event::new(EventType::ServerUnreachable, message.clone()));
            return Err(ValidationError::new(ErrorCode::ServerUnreachable, message).into());
        }

        info!("seat released for instance {instance_id}");
        self.inner
            .events
            .emit(Event::new(EventType::SeatReleased, "seat released"));
        Ok(())
    }
}
