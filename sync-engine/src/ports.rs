//! Port contracts consumed by the actor runtime.
//!
//! Ports are the seams between the deterministic engine and the outside
//! world: the radio, the host application, the clock, durable storage
//! and telemetry. Implementations live outside this workspace (platform
//! adapters) or in [`fakes`](crate::fakes) for tests.
//!
//! Port methods never raise: failures are encoded in the returned
//! [`Event`], so the error taxonomy stays in one place. Ports must not
//! call back into the actor synchronously - results re-enter through
//! the mailbox.

use std::collections::BTreeMap;

use async_trait::async_trait;
use ble_sync_types::{
    DeviceId, Event, EventOffset, EventRange, PageSize, SyncSnapshot, TimestampMs,
};

/// Opaque handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub u64);

/// Callback invoked when a scheduled timer fires.
///
/// The callback must only post a message to the actor's mailbox; it
/// must never touch aggregate state directly.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// The radio-facing port.
///
/// Calls may block (dialogs, radio I/O); from the actor's point of view
/// they return synchronously with exactly one event.
#[async_trait]
pub trait BlePort: Send + Sync {
    /// Bond with the device. Returns `DeviceBonded` or `SyncFailed`.
    async fn bond(&self, device: &DeviceId) -> Event;

    /// Open a GATT connection. Returns `DeviceConnected`, `Disconnected`
    /// or `SyncFailed`.
    async fn connect(&self, device: &DeviceId) -> Event;

    /// Tear the link down. Returns `Disconnected`.
    async fn disconnect(&self, device: &DeviceId) -> Event;

    /// Read the total event count characteristic. Returns
    /// `EventCountLoaded`, `Disconnected` or `SyncFailed`.
    async fn read_count(&self, device: &DeviceId) -> Event;

    /// Read a page of `count` events starting at `offset`. Returns
    /// `EventsRead`, `Disconnected` or `SyncFailed`.
    async fn read_page(&self, device: &DeviceId, offset: EventOffset, count: PageSize) -> Event;

    /// Write the acknowledgement high-water mark. Returns `EventsAcked`,
    /// `Disconnected` or `SyncFailed`.
    async fn ack(&self, device: &DeviceId, up_to: EventOffset) -> Event;
}

/// Hands read pages to the host application.
#[async_trait]
pub trait DeliveryPort: Send + Sync {
    /// Deliver a range. Returns `EventsDelivered`, `Disconnected` or
    /// `SyncFailed`.
    async fn deliver(&self, device: &DeviceId, range: EventRange) -> Event;
}

/// Time source and timer scheduler.
///
/// Tests supply a virtual clock; production uses the tokio-backed
/// [`TokioClock`](crate::clock::TokioClock).
pub trait ClockPort: Send + Sync {
    /// The current time.
    fn now(&self) -> TimestampMs;

    /// Arm a timer that invokes `on_fire` at (or after) `at`.
    fn schedule(&self, at: TimestampMs, on_fire: TimerCallback) -> TimerToken;

    /// Cancel a timer. Cancelling an already-fired or unknown token is
    /// a no-op.
    fn cancel(&self, token: TimerToken);
}

/// Durable snapshot storage, keyed by device.
///
/// Writes are expected to be atomic per record; corrupted reads must
/// surface as "absent", never as an error that blocks a cold start.
#[async_trait]
pub trait StateStorePort: Send + Sync {
    /// Read the snapshot for a device, if one exists.
    async fn read(&self, device: &DeviceId) -> Option<SyncSnapshot>;

    /// Persist a snapshot, replacing any previous one for the device.
    async fn write(&self, snapshot: SyncSnapshot);
}

/// A structured telemetry event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryEvent {
    /// Name from the engine's telemetry vocabulary.
    pub name: String,
    /// When the event was emitted.
    pub at: TimestampMs,
    /// Device the event concerns.
    pub device: DeviceId,
    /// Free-form string attributes.
    pub data: BTreeMap<String, String>,
}

impl TelemetryEvent {
    /// Create an event with no attributes.
    pub fn new(name: impl Into<String>, at: TimestampMs, device: DeviceId) -> Self {
        Self {
            name: name.into(),
            at,
            device,
            data: BTreeMap::new(),
        }
    }

    /// Attach one attribute.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.data.insert(key.into(), value.to_string());
        self
    }
}

/// Fire-and-forget telemetry sink.
pub trait TelemetryPort: Send + Sync {
    /// Emit one event. Must not block and must not fail the caller.
    fn emit(&self, event: TelemetryEvent);
}

/// Telemetry event names emitted by the runtime and by port adapters.
pub mod telemetry {
    /// A snapshot was written (data: reason, acked, page_size, cursor).
    pub const SNAPSHOT_SAVED: &str = "snapshot_saved";
    /// A snapshot was restored at bootstrap.
    pub const SNAPSHOT_RESTORED: &str = "snapshot_restored";
    /// The retry timer was armed (data: after, reason).
    pub const RETRY_SCHEDULED: &str = "retry_scheduled";
    /// A `SyncFailed` event passed through the mailbox (data: reason).
    pub const SYNC_FAILED: &str = "sync_failed";
    /// A page read was dropped because one was already in flight.
    pub const READ_SKIPPED_BACKPRESSURE: &str = "read_skipped_backpressure";
    /// Reserved for dynamic command layers; the core executor matches
    /// commands exhaustively and cannot emit it.
    pub const UNKNOWN_COMMAND_IGNORED: &str = "unknown_command_ignored";

    /// Port adapters: bonding completed.
    pub const BONDED: &str = "bonded";
    /// Port adapters: GATT connection established.
    pub const GATT_CONNECTED: &str = "gatt_connected";
    /// Port adapters: GATT connection lost.
    pub const GATT_DISCONNECTED: &str = "gatt_disconnected";
    /// Port adapters: count characteristic read (data: total).
    pub const COUNT_READ: &str = "count_read";
    /// Port adapters: page read (data: offset, count).
    pub const PAGE_READ: &str = "page_read";
    /// Port adapters: ack written (data: up_to).
    pub const ACK_SENT: &str = "ack_sent";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_event_builder() {
        let device = DeviceId::new("dev-1").unwrap();
        let event = TelemetryEvent::new(telemetry::SNAPSHOT_SAVED, TimestampMs::new(100), device)
            .with("reason", "acked")
            .with("acked", 120);

        assert_eq!(event.name, "snapshot_saved");
        assert_eq!(event.data.get("reason").map(String::as_str), Some("acked"));
        assert_eq!(event.data.get("acked").map(String::as_str), Some("120"));
    }

    #[test]
    fn ports_are_object_safe() {
        fn assert_object_safe(
            _: Option<&dyn BlePort>,
            _: Option<&dyn DeliveryPort>,
            _: Option<&dyn ClockPort>,
            _: Option<&dyn StateStorePort>,
            _: Option<&dyn TelemetryPort>,
        ) {
        }
        assert_object_safe(None, None, None, None, None);
    }
}
