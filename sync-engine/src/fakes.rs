//! In-memory port fakes for driving the engine in tests.
//!
//! Same pattern throughout: shared state behind `Arc<Mutex<_>>`,
//! scripted responses consumed in order, `fail_*` fault injection, and
//! recorded calls for verification. Wrap each fake in an `Arc` and hand
//! clones to the actor and to the test.
//!
//! These are published (not `#[cfg(test)]`) so adapter crates and host
//! applications can reuse them in their own tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ble_sync_types::{
    wire, DeviceId, DisconnectReason, DomainError, Event, EventOffset, EventRange, PageSize,
    SyncSnapshot, TimestampMs,
};

use crate::ports::{
    telemetry, BlePort, ClockPort, DeliveryPort, StateStorePort, TelemetryEvent, TelemetryPort,
    TimerCallback, TimerToken,
};

// ===========================================
// Virtual clock
// ===========================================

struct VirtualTimer {
    token: u64,
    at: i64,
    on_fire: TimerCallback,
}

struct VirtualClockInner {
    now: i64,
    next_token: u64,
    timers: Vec<VirtualTimer>,
}

/// A fully controllable clock.
///
/// Time only moves when the test calls [`advance`](Self::advance) or
/// [`advance_to`](Self::advance_to); due timers fire in deadline order
/// during the advance.
pub struct VirtualClock {
    inner: Mutex<VirtualClockInner>,
}

impl VirtualClock {
    /// Create a clock starting at the given epoch-millisecond value.
    pub fn new(start_ms: i64) -> Self {
        Self {
            inner: Mutex::new(VirtualClockInner {
                now: start_ms,
                next_token: 0,
                timers: Vec::new(),
            }),
        }
    }

    /// Move time forward by `ms`, firing due timers in order.
    pub fn advance(&self, ms: u64) {
        let target = {
            let inner = self.inner.lock().unwrap();
            inner.now.saturating_add(ms.min(i64::MAX as u64) as i64)
        };
        self.advance_to(target);
    }

    /// Move time to `at_ms`, firing due timers in order.
    ///
    /// Callbacks run outside the internal lock, so a callback may
    /// schedule or cancel timers.
    pub fn advance_to(&self, at_ms: i64) {
        loop {
            let due = {
                let mut inner = self.inner.lock().unwrap();
                let next = inner
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.at <= at_ms)
                    .min_by_key(|(_, timer)| (timer.at, timer.token))
                    .map(|(index, _)| index);
                match next {
                    Some(index) => {
                        let timer = inner.timers.remove(index);
                        inner.now = inner.now.max(timer.at);
                        Some(timer)
                    }
                    None => {
                        inner.now = inner.now.max(at_ms);
                        None
                    }
                }
            };
            match due {
                Some(timer) => (timer.on_fire)(),
                None => break,
            }
        }
    }

    /// Number of armed timers.
    pub fn pending_timers(&self) -> usize {
        self.inner.lock().unwrap().timers.len()
    }
}

impl ClockPort for VirtualClock {
    fn now(&self) -> TimestampMs {
        TimestampMs::new(self.inner.lock().unwrap().now)
    }

    fn schedule(&self, at: TimestampMs, on_fire: TimerCallback) -> TimerToken {
        let mut inner = self.inner.lock().unwrap();
        let token = inner.next_token;
        inner.next_token += 1;
        inner.timers.push(VirtualTimer {
            token,
            at: at.value(),
            on_fire,
        });
        TimerToken(token)
    }

    fn cancel(&self, token: TimerToken) {
        let mut inner = self.inner.lock().unwrap();
        inner.timers.retain(|timer| timer.token != token.0);
    }
}

// ===========================================
// Scripted BLE port
// ===========================================

/// One recorded call against the scripted BLE port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BleCall {
    /// `bond` was invoked.
    Bond,
    /// `connect` was invoked.
    Connect,
    /// `disconnect` was invoked.
    Disconnect,
    /// `read_count` was invoked.
    ReadCount,
    /// `read_page` was invoked with these arguments.
    ReadPage {
        /// Requested start offset.
        offset: EventOffset,
        /// Requested page size.
        count: PageSize,
    },
    /// `ack` was invoked with this high-water mark.
    Ack {
        /// Acknowledged exclusive upper bound.
        up_to: EventOffset,
    },
}

#[derive(Default)]
struct ScriptedBleInner {
    counts: VecDeque<Vec<u8>>,
    connect_faults: VecDeque<(DisconnectReason, Option<i32>)>,
    read_outcomes: VecDeque<Option<(DisconnectReason, Option<i32>)>>,
    fail_next_bond: Option<DomainError>,
    fail_next_ack: Option<(DisconnectReason, Option<i32>)>,
    calls: Vec<BleCall>,
}

/// A scripted in-memory peripheral.
///
/// Count reads consume scripted payloads ([`script_count`]); when the
/// script runs dry the fake reports the peripheral closing the link,
/// which parks the engine in its retry path - a natural quiescent point
/// for drain-based tests. Connect and page-read faults are queued and
/// consumed in call order.
///
/// [`script_count`]: Self::script_count
pub struct ScriptedBle {
    clock: Arc<dyn ClockPort>,
    telemetry: Option<Arc<dyn TelemetryPort>>,
    inner: Mutex<ScriptedBleInner>,
}

impl ScriptedBle {
    /// Create a fake that stamps events with the given clock.
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            clock,
            telemetry: None,
            inner: Mutex::new(ScriptedBleInner::default()),
        }
    }

    /// Emit adapter telemetry (`bonded`, `page_read`, ...) to the given
    /// sink, the way a real adapter would.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetryPort>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Queue a count-read response reporting `total` events.
    pub fn script_count(&self, total: u32) {
        self.script_count_payload(total.to_le_bytes().to_vec());
    }

    /// Queue a raw count-read payload (for malformed-payload tests).
    pub fn script_count_payload(&self, payload: Vec<u8>) {
        self.inner.lock().unwrap().counts.push_back(payload);
    }

    /// Queue a connect failure. Connects succeed once the queue is empty.
    pub fn script_connect_fault(&self, reason: DisconnectReason, gatt_code: Option<i32>) {
        self.inner
            .lock()
            .unwrap()
            .connect_faults
            .push_back((reason, gatt_code));
    }

    /// Queue a successful page read.
    pub fn script_read_ok(&self) {
        self.inner.lock().unwrap().read_outcomes.push_back(None);
    }

    /// Queue a failed page read.
    pub fn script_read_fault(&self, reason: DisconnectReason, gatt_code: Option<i32>) {
        self.inner
            .lock()
            .unwrap()
            .read_outcomes
            .push_back(Some((reason, gatt_code)));
    }

    /// Fail the next bond call with the given error.
    pub fn fail_next_bond(&self, error: DomainError) {
        self.inner.lock().unwrap().fail_next_bond = Some(error);
    }

    /// Fail the next ack write with a disconnect.
    pub fn fail_next_ack(&self, reason: DisconnectReason, gatt_code: Option<i32>) {
        self.inner.lock().unwrap().fail_next_ack = Some((reason, gatt_code));
    }

    /// All calls made against this port, in order.
    pub fn calls(&self) -> Vec<BleCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    fn record(&self, call: BleCall) {
        self.inner.lock().unwrap().calls.push(call);
    }

    fn emit(&self, event: TelemetryEvent) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.emit(event);
        }
    }

    fn now(&self) -> TimestampMs {
        self.clock.now()
    }
}

#[async_trait]
impl BlePort for ScriptedBle {
    async fn bond(&self, device: &DeviceId) -> Event {
        self.record(BleCall::Bond);
        let at = self.now();
        if let Some(error) = self.inner.lock().unwrap().fail_next_bond.take() {
            return Event::SyncFailed {
                device: device.clone(),
                at,
                reason: error,
            };
        }
        self.emit(TelemetryEvent::new(telemetry::BONDED, at, device.clone()));
        Event::DeviceBonded {
            device: device.clone(),
            at,
        }
    }

    async fn connect(&self, device: &DeviceId) -> Event {
        self.record(BleCall::Connect);
        let at = self.now();
        if let Some((reason, gatt_code)) = self.inner.lock().unwrap().connect_faults.pop_front() {
            self.emit(TelemetryEvent::new(
                telemetry::GATT_DISCONNECTED,
                at,
                device.clone(),
            ));
            return Event::Disconnected {
                device: device.clone(),
                at,
                reason,
                gatt_code,
            };
        }
        self.emit(TelemetryEvent::new(
            telemetry::GATT_CONNECTED,
            at,
            device.clone(),
        ));
        Event::DeviceConnected {
            device: device.clone(),
            at,
        }
    }

    async fn disconnect(&self, device: &DeviceId) -> Event {
        self.record(BleCall::Disconnect);
        Event::Disconnected {
            device: device.clone(),
            at: self.now(),
            reason: DisconnectReason::PeerClosed,
            gatt_code: None,
        }
    }

    async fn read_count(&self, device: &DeviceId) -> Event {
        self.record(BleCall::ReadCount);
        let at = self.now();
        let payload = self.inner.lock().unwrap().counts.pop_front();
        match payload {
            Some(payload) => match wire::decode_event_count(&payload) {
                Ok(total) => {
                    self.emit(
                        TelemetryEvent::new(telemetry::COUNT_READ, at, device.clone())
                            .with("total", total),
                    );
                    Event::EventCountLoaded {
                        device: device.clone(),
                        at,
                        total,
                    }
                }
                Err(error) => Event::SyncFailed {
                    device: device.clone(),
                    at,
                    reason: error,
                },
            },
            // Script exhausted: the peripheral closes the link.
            None => Event::Disconnected {
                device: device.clone(),
                at,
                reason: DisconnectReason::PeerClosed,
                gatt_code: None,
            },
        }
    }

    async fn read_page(&self, device: &DeviceId, offset: EventOffset, count: PageSize) -> Event {
        self.record(BleCall::ReadPage { offset, count });
        let at = self.now();
        let outcome = self
            .inner
            .lock()
            .unwrap()
            .read_outcomes
            .pop_front()
            .unwrap_or(None);
        if let Some((reason, gatt_code)) = outcome {
            return Event::Disconnected {
                device: device.clone(),
                at,
                reason,
                gatt_code,
            };
        }
        match wire::encode_page_request(offset, count) {
            Ok(_) => {
                self.emit(
                    TelemetryEvent::new(telemetry::PAGE_READ, at, device.clone())
                        .with("offset", offset)
                        .with("count", count),
                );
                Event::EventsRead {
                    device: device.clone(),
                    at,
                    range: EventRange::from_count(offset, count),
                }
            }
            Err(error) => Event::SyncFailed {
                device: device.clone(),
                at,
                reason: error,
            },
        }
    }

    async fn ack(&self, device: &DeviceId, up_to: EventOffset) -> Event {
        self.record(BleCall::Ack { up_to });
        let at = self.now();
        if let Some((reason, gatt_code)) = self.inner.lock().unwrap().fail_next_ack.take() {
            return Event::Disconnected {
                device: device.clone(),
                at,
                reason,
                gatt_code,
            };
        }
        match wire::encode_ack(up_to) {
            Ok(_) => {
                self.emit(
                    TelemetryEvent::new(telemetry::ACK_SENT, at, device.clone())
                        .with("up_to", up_to),
                );
                Event::EventsAcked {
                    device: device.clone(),
                    at,
                    up_to,
                }
            }
            Err(error) => Event::SyncFailed {
                device: device.clone(),
                at,
                reason: error,
            },
        }
    }
}

// ===========================================
// Delivery port
// ===========================================

#[derive(Default)]
struct DeliveryInner {
    delivered: Vec<EventRange>,
    fail_next: Option<DomainError>,
}

/// Records delivered ranges.
pub struct InMemoryDelivery {
    clock: Arc<dyn ClockPort>,
    inner: Mutex<DeliveryInner>,
}

impl InMemoryDelivery {
    /// Create a delivery fake that stamps events with the given clock.
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            clock,
            inner: Mutex::new(DeliveryInner::default()),
        }
    }

    /// Ranges delivered so far, in order.
    pub fn delivered(&self) -> Vec<EventRange> {
        self.inner.lock().unwrap().delivered.clone()
    }

    /// Fail the next delivery with the given error.
    pub fn fail_next_deliver(&self, error: DomainError) {
        self.inner.lock().unwrap().fail_next = Some(error);
    }
}

#[async_trait]
impl DeliveryPort for InMemoryDelivery {
    async fn deliver(&self, device: &DeviceId, range: EventRange) -> Event {
        let at = self.clock.now();
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next.take() {
            return Event::SyncFailed {
                device: device.clone(),
                at,
                reason: error,
            };
        }
        inner.delivered.push(range);
        Event::EventsDelivered {
            device: device.clone(),
            at,
            range,
        }
    }
}

// ===========================================
// State store
// ===========================================

/// Snapshot storage in a HashMap.
#[derive(Default)]
pub struct MemoryStateStore {
    inner: Mutex<HashMap<DeviceId, SyncSnapshot>>,
}

impl MemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a snapshot, as if a previous run wrote it.
    pub fn preload(&self, snapshot: SyncSnapshot) {
        self.inner
            .lock()
            .unwrap()
            .insert(snapshot.device.clone(), snapshot);
    }

    /// Read a snapshot without going through the port.
    pub fn get(&self, device: &DeviceId) -> Option<SyncSnapshot> {
        self.inner.lock().unwrap().get(device).cloned()
    }
}

#[async_trait]
impl StateStorePort for MemoryStateStore {
    async fn read(&self, device: &DeviceId) -> Option<SyncSnapshot> {
        self.inner.lock().unwrap().get(device).cloned()
    }

    async fn write(&self, snapshot: SyncSnapshot) {
        self.inner
            .lock()
            .unwrap()
            .insert(snapshot.device.clone(), snapshot);
    }
}

// ===========================================
// Telemetry
// ===========================================

/// Collects telemetry events for assertions.
#[derive(Default)]
pub struct CollectingTelemetry {
    inner: Mutex<Vec<TelemetryEvent>>,
}

impl CollectingTelemetry {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// All collected events, in emission order.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.inner.lock().unwrap().clone()
    }

    /// The names of all collected events, in emission order.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.name.clone())
            .collect()
    }

    /// Whether an event with the given name was emitted.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().unwrap().iter().any(|event| event.name == name)
    }

    /// How many events with the given name were emitted.
    pub fn count_of(&self, name: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.name == name)
            .count()
    }
}

impl TelemetryPort for CollectingTelemetry {
    fn emit(&self, event: TelemetryEvent) {
        self.inner.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dev() -> DeviceId {
        DeviceId::new("dev-1").unwrap()
    }

    // ===========================================
    // VirtualClock
    // ===========================================

    #[test]
    fn clock_starts_where_told() {
        let clock = VirtualClock::new(5000);
        assert_eq!(clock.now(), TimestampMs::new(5000));
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let clock = VirtualClock::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        for (label, at) in [("late", 300), ("early", 100), ("mid", 200)] {
            let order = Arc::clone(&order);
            clock.schedule(
                TimestampMs::new(at),
                Box::new(move || order.lock().unwrap().push(label)),
            );
        }

        clock.advance_to(250);
        assert_eq!(*order.lock().unwrap(), vec!["early", "mid"]);
        assert_eq!(clock.pending_timers(), 1);

        clock.advance_to(300);
        assert_eq!(*order.lock().unwrap(), vec!["early", "mid", "late"]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let clock = VirtualClock::new(0);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);

        let token = clock.schedule(
            TimestampMs::new(100),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        clock.cancel(token);
        clock.advance_to(1000);

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(clock.pending_timers(), 0);
    }

    #[test]
    fn advance_moves_now_even_without_timers() {
        let clock = VirtualClock::new(100);
        clock.advance(400);
        assert_eq!(clock.now(), TimestampMs::new(500));
    }

    // ===========================================
    // ScriptedBle
    // ===========================================

    #[tokio::test]
    async fn scripted_ble_happy_responses() {
        let clock: Arc<dyn ClockPort> = Arc::new(VirtualClock::new(1000));
        let ble = ScriptedBle::new(Arc::clone(&clock));
        ble.script_count(120);

        assert!(matches!(ble.bond(&dev()).await, Event::DeviceBonded { .. }));
        assert!(matches!(
            ble.connect(&dev()).await,
            Event::DeviceConnected { .. }
        ));
        assert!(matches!(
            ble.read_count(&dev()).await,
            Event::EventCountLoaded { total, .. } if total.value() == 120
        ));

        let page = ble
            .read_page(&dev(), EventOffset::zero(), PageSize::new(50).unwrap())
            .await;
        assert!(matches!(
            page,
            Event::EventsRead { range, .. }
                if range.start() == EventOffset::zero() && range.end() == EventOffset::new(50)
        ));

        assert!(matches!(
            ble.ack(&dev(), EventOffset::new(50)).await,
            Event::EventsAcked { up_to, .. } if up_to == EventOffset::new(50)
        ));

        assert_eq!(
            ble.calls(),
            vec![
                BleCall::Bond,
                BleCall::Connect,
                BleCall::ReadCount,
                BleCall::ReadPage {
                    offset: EventOffset::zero(),
                    count: PageSize::new(50).unwrap(),
                },
                BleCall::Ack {
                    up_to: EventOffset::new(50),
                },
            ]
        );
    }

    #[tokio::test]
    async fn exhausted_count_script_closes_the_link() {
        let clock: Arc<dyn ClockPort> = Arc::new(VirtualClock::new(0));
        let ble = ScriptedBle::new(clock);

        let event = ble.read_count(&dev()).await;
        assert!(matches!(
            event,
            Event::Disconnected {
                reason: DisconnectReason::PeerClosed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn malformed_count_payload_is_a_protocol_failure() {
        let clock: Arc<dyn ClockPort> = Arc::new(VirtualClock::new(0));
        let ble = ScriptedBle::new(clock);
        ble.script_count_payload(vec![0x01, 0x02]);

        let event = ble.read_count(&dev()).await;
        assert!(matches!(
            event,
            Event::SyncFailed {
                reason: DomainError::Protocol(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn connect_faults_are_consumed_in_order() {
        let clock: Arc<dyn ClockPort> = Arc::new(VirtualClock::new(0));
        let ble = ScriptedBle::new(clock);
        ble.script_connect_fault(DisconnectReason::Timeout, Some(8));

        assert!(matches!(
            ble.connect(&dev()).await,
            Event::Disconnected {
                reason: DisconnectReason::Timeout,
                gatt_code: Some(8),
                ..
            }
        ));
        assert!(matches!(
            ble.connect(&dev()).await,
            Event::DeviceConnected { .. }
        ));
    }

    #[tokio::test]
    async fn read_outcomes_interleave_success_and_fault() {
        let clock: Arc<dyn ClockPort> = Arc::new(VirtualClock::new(0));
        let ble = ScriptedBle::new(clock);
        ble.script_read_ok();
        ble.script_read_fault(DisconnectReason::GattError, Some(133));

        let offset = EventOffset::zero();
        let count = PageSize::new(50).unwrap();
        assert!(matches!(
            ble.read_page(&dev(), offset, count).await,
            Event::EventsRead { .. }
        ));
        assert!(matches!(
            ble.read_page(&dev(), offset, count).await,
            Event::Disconnected { gatt_code: Some(133), .. }
        ));
        // Queue exhausted: back to success.
        assert!(matches!(
            ble.read_page(&dev(), offset, count).await,
            Event::EventsRead { .. }
        ));
    }

    #[tokio::test]
    async fn bond_fault_surfaces_as_sync_failed() {
        let clock: Arc<dyn ClockPort> = Arc::new(VirtualClock::new(0));
        let ble = ScriptedBle::new(clock);
        ble.fail_next_bond(DomainError::UserActionRequired("confirm pairing".into()));

        assert!(matches!(
            ble.bond(&dev()).await,
            Event::SyncFailed {
                reason: DomainError::UserActionRequired(_),
                ..
            }
        ));
        // Single shot: the next bond succeeds.
        assert!(matches!(ble.bond(&dev()).await, Event::DeviceBonded { .. }));
    }

    #[tokio::test]
    async fn ack_fault_surfaces_as_disconnect() {
        let clock: Arc<dyn ClockPort> = Arc::new(VirtualClock::new(0));
        let ble = ScriptedBle::new(clock);
        ble.fail_next_ack(DisconnectReason::Timeout, Some(8));

        assert!(matches!(
            ble.ack(&dev(), EventOffset::new(50)).await,
            Event::Disconnected {
                reason: DisconnectReason::Timeout,
                gatt_code: Some(8),
                ..
            }
        ));
        assert!(matches!(
            ble.ack(&dev(), EventOffset::new(50)).await,
            Event::EventsAcked { .. }
        ));
    }

    #[tokio::test]
    async fn adapter_telemetry_is_emitted_when_wired() {
        let clock: Arc<dyn ClockPort> = Arc::new(VirtualClock::new(0));
        let sink = Arc::new(CollectingTelemetry::new());
        let ble = ScriptedBle::new(clock).with_telemetry(sink.clone() as Arc<dyn TelemetryPort>);
        ble.script_count(10);

        ble.bond(&dev()).await;
        ble.connect(&dev()).await;
        ble.read_count(&dev()).await;

        assert_eq!(
            sink.names(),
            vec!["bonded", "gatt_connected", "count_read"]
        );
    }

    // ===========================================
    // Delivery, store, telemetry
    // ===========================================

    #[tokio::test]
    async fn delivery_records_ranges() {
        let clock: Arc<dyn ClockPort> = Arc::new(VirtualClock::new(0));
        let delivery = InMemoryDelivery::new(clock);
        let range = EventRange::new(EventOffset::zero(), EventOffset::new(50)).unwrap();

        let event = delivery.deliver(&dev(), range).await;

        assert!(matches!(event, Event::EventsDelivered { .. }));
        assert_eq!(delivery.delivered(), vec![range]);
    }

    #[tokio::test]
    async fn delivery_fault_is_single_shot() {
        let clock: Arc<dyn ClockPort> = Arc::new(VirtualClock::new(0));
        let delivery = InMemoryDelivery::new(clock);
        let range = EventRange::new(EventOffset::zero(), EventOffset::new(50)).unwrap();
        delivery.fail_next_deliver(DomainError::Unexpected("app gone".into()));

        assert!(matches!(
            delivery.deliver(&dev(), range).await,
            Event::SyncFailed { .. }
        ));
        assert!(matches!(
            delivery.deliver(&dev(), range).await,
            Event::EventsDelivered { .. }
        ));
        assert_eq!(delivery.delivered(), vec![range]);
    }

    #[tokio::test]
    async fn store_roundtrips_snapshots() {
        let store = MemoryStateStore::new();
        let snapshot = SyncSnapshot::new(
            dev(),
            EventOffset::new(50),
            PageSize::new(50).unwrap(),
            "Acked:50",
        );

        assert!(store.read(&dev()).await.is_none());
        store.write(snapshot.clone()).await;
        assert_eq!(store.read(&dev()).await, Some(snapshot));
    }

    #[test]
    fn telemetry_collector_counts_names() {
        let sink = CollectingTelemetry::new();
        sink.emit(TelemetryEvent::new("a", TimestampMs::new(0), dev()));
        sink.emit(TelemetryEvent::new("b", TimestampMs::new(1), dev()));
        sink.emit(TelemetryEvent::new("a", TimestampMs::new(2), dev()));

        assert!(sink.contains("a"));
        assert!(!sink.contains("c"));
        assert_eq!(sink.count_of("a"), 2);
        assert_eq!(sink.names(), vec!["a", "b", "a"]);
    }
}
