//! Per-device sync state and the event reducer.
//!
//! [`SyncAggregate`] is the authoritative snapshot of one device's sync
//! progress. It is immutable from the outside: the only way it changes
//! is [`Reducer::apply`] consuming an event and returning the next
//! value. The reducer is total and deterministic - unknown combinations
//! are no-ops, never faults, and `now` is always the event's own
//! timestamp.

use std::collections::HashMap;
use std::sync::Arc;

use ble_sync_types::{
    AttemptKey, DeviceId, DomainError, Event, EventCount, EventOffset, PageSize, SyncSnapshot,
};

use crate::breaker::{BreakerPolicy, BreakerState, CountingBreaker};

/// Bonding progress with the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondStatus {
    /// Bond state has not been observed yet.
    Unknown,
    /// The device is not bonded.
    NotBonded,
    /// A bonding exchange is in progress.
    Bonding,
    /// The device is bonded.
    Bonded,
}

/// GATT link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No link.
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The link is up.
    Connected,
}

/// The authoritative per-device sync state.
///
/// `last_acked_exclusive` is the exactly-once high-water mark: every
/// offset below it has been durably delivered to the host. It never
/// decreases.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncAggregate {
    /// Device this state belongs to.
    pub device: DeviceId,
    /// Bonding progress.
    pub bond_status: BondStatus,
    /// GATT link state.
    pub connection_status: ConnectionStatus,
    /// Exclusive upper bound of durably delivered offsets. Monotonic.
    pub last_acked_exclusive: EventOffset,
    /// Start of the currently read page, if a page is in flight.
    pub in_flight_offset: Option<EventOffset>,
    /// The most recently observed device-side total. May grow.
    pub total_on_device: EventCount,
    /// Current adaptive page size.
    pub page_size: PageSize,
    /// Attempt counters, bucketed by operation family.
    pub attempts: HashMap<AttemptKey, u32>,
    /// Breaker state for bonding.
    pub bond_breaker: BreakerState,
    /// Breaker state for GATT connects.
    pub connect_breaker: BreakerState,
    /// Breaker state for page reads.
    pub read_breaker: BreakerState,
    /// Breaker state for host delivery.
    pub deliver_breaker: BreakerState,
    /// Breaker state for acknowledgement writes.
    pub ack_breaker: BreakerState,
    /// The most recent error, if any.
    pub last_error: Option<DomainError>,
    /// Human-readable saga position, for observability only.
    pub saga_cursor: String,
}

impl SyncAggregate {
    /// A fresh aggregate for a device that has never synced.
    pub fn new(device: DeviceId, page_size: PageSize) -> Self {
        Self {
            device,
            bond_status: BondStatus::Unknown,
            connection_status: ConnectionStatus::Disconnected,
            last_acked_exclusive: EventOffset::zero(),
            in_flight_offset: None,
            total_on_device: EventCount::zero(),
            page_size,
            attempts: HashMap::new(),
            bond_breaker: BreakerState::closed(),
            connect_breaker: BreakerState::closed(),
            read_breaker: BreakerState::closed(),
            deliver_breaker: BreakerState::closed(),
            ack_breaker: BreakerState::closed(),
            last_error: None,
            saga_cursor: "Initial".to_string(),
        }
    }

    /// Apply a persisted snapshot: high-water mark, page size and cursor.
    /// Nothing else is restored - connection and breaker state are
    /// rebuilt against the live device.
    pub fn restore(mut self, snapshot: &SyncSnapshot) -> Self {
        self.last_acked_exclusive = snapshot.last_acked_exclusive;
        self.page_size = snapshot.page_size;
        self.saga_cursor = snapshot.saga_cursor.clone();
        self
    }

    /// Whether everything the device reported has been delivered.
    pub fn is_fully_acked(&self) -> bool {
        self.last_acked_exclusive.value() >= self.total_on_device.value()
    }

    /// Whether a page read is currently in flight.
    pub fn has_in_flight(&self) -> bool {
        self.in_flight_offset.is_some()
    }

    /// Attempts recorded for an operation family.
    pub fn attempts_for(&self, key: AttemptKey) -> u32 {
        self.attempts.get(&key).copied().unwrap_or(0)
    }
}

/// Pure event application.
///
/// Holds the breaker policy so that connect failures and successes move
/// the aggregate's breaker state; everything else in `apply` is plain
/// field bookkeeping.
pub struct Reducer {
    breaker: Arc<dyn BreakerPolicy>,
}

impl Reducer {
    /// Create a reducer with the given breaker policy.
    pub fn new(breaker: Arc<dyn BreakerPolicy>) -> Self {
        Self { breaker }
    }

    /// Fold one event into the aggregate, returning the next value.
    pub fn apply(&self, aggregate: &SyncAggregate, event: &Event) -> SyncAggregate {
        let mut next = aggregate.clone();
        match event {
            Event::DeviceBonded { at, .. } => {
                next.bond_status = BondStatus::Bonded;
                next.bond_breaker = self.breaker.on_success(*at, &next.bond_breaker);
                next.attempts.remove(&AttemptKey::BOND_DEVICE);
                next.saga_cursor = "Bonded".to_string();
            }
            Event::DeviceConnected { at, .. } => {
                next.connection_status = ConnectionStatus::Connected;
                next.connect_breaker = self.breaker.on_success(*at, &next.connect_breaker);
                next.attempts.remove(&AttemptKey::CONNECT_GATT);
                next.saga_cursor = "Connected".to_string();
            }
            Event::EventCountLoaded { total, .. } => {
                // Totals are monotonic; a shrinking count read is ignored
                // rather than regressing progress accounting.
                next.total_on_device = next.total_on_device.max(*total);
                next.saga_cursor = "CountLoaded".to_string();
            }
            Event::EventsRead { range, .. } => {
                next.in_flight_offset = Some(range.start());
                if let Some(size) = u32::try_from(range.count().value())
                    .ok()
                    .and_then(PageSize::new)
                {
                    next.page_size = size;
                }
                next.saga_cursor = format!("Read:{}-{}", range.start(), range.end());
            }
            Event::EventsDelivered { range, .. } => {
                // Delivery alone does not advance the high-water mark;
                // only the device-confirmed ack does.
                next.saga_cursor = format!("Delivered:{}-{}", range.start(), range.end());
            }
            Event::EventsAcked { up_to, .. } => {
                if *up_to <= next.last_acked_exclusive {
                    // Regressed or duplicate ack: the whole event is a no-op.
                    return next;
                }
                next.last_acked_exclusive = *up_to;
                if let Some(start) = next.in_flight_offset {
                    let page_end = start + EventCount::new(next.page_size.value() as u64);
                    if next.last_acked_exclusive >= page_end {
                        next.in_flight_offset = None;
                    }
                }
                next.saga_cursor = format!("Acked:{}", next.last_acked_exclusive);
            }
            Event::Disconnected {
                at,
                reason,
                gatt_code,
                ..
            } => {
                let error = DomainError::Transport {
                    message: reason.to_string(),
                    code: *gatt_code,
                };
                next.connection_status = ConnectionStatus::Disconnected;
                next.connect_breaker =
                    self.breaker.on_failure(*at, &next.connect_breaker, &error);
                *next.attempts.entry(AttemptKey::CONNECT_GATT).or_insert(0) += 1;
                next.last_error = Some(error);
                next.saga_cursor = "Disconnected".to_string();
            }
            Event::RetryScheduled { after, .. } => {
                next.saga_cursor = format!("RetryScheduled@{}", after);
            }
            Event::SyncCompleted { .. } => {
                next.saga_cursor = "Completed".to_string();
            }
            Event::SyncFailed { reason, .. } => {
                next.last_error = Some(reason.clone());
                next.saga_cursor = "Failed".to_string();
            }
        }
        next
    }
}

impl Default for Reducer {
    fn default() -> Self {
        Self::new(Arc::new(CountingBreaker::default()))
    }
}
