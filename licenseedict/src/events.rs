//! Lifecycle events delivered from background work to the host application.
//!
//! Delivery is best effort. Every producer offers events without blocking; if
//! the consumer has not drained the buffer the event is dropped. Consumers that
//! cannot afford to miss anything should poll client state instead.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

/// Capacity of the per-client event channel.
pub const EVENTS_CHANNEL_SIZE: usize = 16;

/// The kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// The server accepted a heartbeat.
    HeartbeatOk,
    /// The server rejected a heartbeat (seat limit reached).
    HeartbeatRejected,
    /// A heartbeat failed in transport or returned an unexpected status.
    HeartbeatError,
    /// A seat was released via checkout.
    SeatReleased,
    /// The license was renewed and re-validated.
    LicenseRenewed,
    /// The server could not be reached.
    ServerUnreachable,
}

/// Server response to a heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatStatus {
    pub status: String,
    pub active_sessions: i64,
    pub max_sessions: i64,
    /// May be negative while the server is over its seat limit.
    pub remaining_sessions: i64,
    /// Seconds until the next heartbeat; 0 or less keeps the current interval.
    pub heartbeat_interval: i64,
    pub grace_period: i64,
    pub license_id: String,
    pub product_id: String,
}

/// Server response to a renewal request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalResult {
    pub status: String,
    pub signed_token: String,
    pub issued_at: String,
    pub expires_at: String,
    pub previous_expires_at: String,
}

/// Payload attached to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    Heartbeat(HeartbeatStatus),
    Renewal(RenewalResult),
}

/// A single lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventType,
    pub message: String,
    pub data: Option<EventData>,
}

impl Event {
    /// Creates an event without a payload.
    pub fn new(kind: EventType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches a payload.
    #[must_use]
    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = Some(data);
        self
    }
}

/// Bounded, drop-on-full fan-out of events to a single consumer.
#[derive(Debug)]
pub(crate) struct EventBus {
    tx: Mutex<Option<mpsc::Sender<Event>>>,
    rx: Mutex<Option<mpsc::Receiver<Event>>>,
}

impl EventBus {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Offers an event without blocking. Full or closed channels drop it.
    pub(crate) fn emit(&self, event: Event) {
        let Ok(guard) = self.tx.lock() else {
            return;
        };
        let Some(tx) = guard.as_ref() else {
            debug!("event bus closed, dropping {:?}", event.kind);
            return;
        };
        if let Err(e) = tx.try_send(event) {
            debug!("dropping event: {e}");
        }
    }

    /// Hands out the receiving half. Only the first caller gets it.
    pub(crate) fn take_receiver(&self) -> Option<mpsc::Receiver<Event>> {
        self.rx.lock().ok().and_then(|mut rx| rx.take())
    }

    /// Drops the sending half; a draining consumer then sees end-of-stream.
    pub(crate) fn close(&self) {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
    }
}
