//! Domain events - facts observed by or reported to the sync engine.
//!
//! Events are produced by executing a command against a port, or arrive
//! from the outside world. The reducer folds them into the aggregate;
//! the saga reads the last one to decide what happens next. Every event
//! carries the device it concerns and the time it was observed.

use serde::{Deserialize, Serialize};

use crate::{DeviceId, DisconnectReason, DomainError, EventCount, EventOffset, EventRange, TimestampMs};

/// All facts the sync engine recognizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The device completed bonding.
    DeviceBonded {
        /// Device the event concerns.
        device: DeviceId,
        /// When the event was observed.
        at: TimestampMs,
    },
    /// A GATT connection was established.
    DeviceConnected {
        /// Device the event concerns.
        device: DeviceId,
        /// When the event was observed.
        at: TimestampMs,
    },
    /// The device reported its total event count.
    EventCountLoaded {
        /// Device the event concerns.
        device: DeviceId,
        /// When the event was observed.
        at: TimestampMs,
        /// Total number of events on the device.
        total: EventCount,
    },
    /// A page of events was read from the device.
    EventsRead {
        /// Device the event concerns.
        device: DeviceId,
        /// When the event was observed.
        at: TimestampMs,
        /// The half-open range that was read.
        range: EventRange,
    },
    /// A page of events was handed to the host application.
    EventsDelivered {
        /// Device the event concerns.
        device: DeviceId,
        /// When the event was observed.
        at: TimestampMs,
        /// The half-open range that was delivered.
        range: EventRange,
    },
    /// The device confirmed an acknowledgement write.
    EventsAcked {
        /// Device the event concerns.
        device: DeviceId,
        /// When the event was observed.
        at: TimestampMs,
        /// Exclusive upper bound of acknowledged offsets.
        up_to: EventOffset,
    },
    /// The GATT link was lost.
    Disconnected {
        /// Device the event concerns.
        device: DeviceId,
        /// When the event was observed.
        at: TimestampMs,
        /// Why the link went away.
        reason: DisconnectReason,
        /// Platform GATT status code, when one was reported.
        gatt_code: Option<i32>,
    },
    /// A retry was scheduled (or a scheduled retry fired).
    RetryScheduled {
        /// Device the event concerns.
        device: DeviceId,
        /// When the event was observed.
        at: TimestampMs,
        /// When the retry is (or was) due.
        after: TimestampMs,
    },
    /// The sync session finished.
    SyncCompleted {
        /// Device the event concerns.
        device: DeviceId,
        /// When the event was observed.
        at: TimestampMs,
    },
    /// The sync session failed terminally.
    SyncFailed {
        /// Device the event concerns.
        device: DeviceId,
        /// When the event was observed.
        at: TimestampMs,
        /// What went wrong.
        reason: DomainError,
    },
}

impl Event {
    /// The device this event concerns.
    pub fn device(&self) -> &DeviceId {
        match self {
            Event::DeviceBonded { device, .. }
            | Event::DeviceConnected { device, .. }
            | Event::EventCountLoaded { device, .. }
            | Event::EventsRead { device, .. }
            | Event::EventsDelivered { device, .. }
            | Event::EventsAcked { device, .. }
            | Event::Disconnected { device, .. }
            | Event::RetryScheduled { device, .. }
            | Event::SyncCompleted { device, .. }
            | Event::SyncFailed { device, .. } => device,
        }
    }

    /// When this event was observed.
    pub fn at(&self) -> TimestampMs {
        match self {
            Event::DeviceBonded { at, .. }
            | Event::DeviceConnected { at, .. }
            | Event::EventCountLoaded { at, .. }
            | Event::EventsRead { at, .. }
            | Event::EventsDelivered { at, .. }
            | Event::EventsAcked { at, .. }
            | Event::Disconnected { at, .. }
            | Event::RetryScheduled { at, .. }
            | Event::SyncCompleted { at, .. }
            | Event::SyncFailed { at, .. } => *at,
        }
    }

    /// Stable snake_case name of the variant, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::DeviceBonded { .. } => "device_bonded",
            Event::DeviceConnected { .. } => "device_connected",
            Event::EventCountLoaded { .. } => "event_count_loaded",
            Event::EventsRead { .. } => "events_read",
            Event::EventsDelivered { .. } => "events_delivered",
            Event::EventsAcked { .. } => "events_acked",
            Event::Disconnected { .. } => "disconnected",
            Event::RetryScheduled { .. } => "retry_scheduled",
            Event::SyncCompleted { .. } => "sync_completed",
            Event::SyncFailed { .. } => "sync_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev() -> DeviceId {
        DeviceId::new("dev-1").unwrap()
    }

    #[test]
    fn accessors_cover_every_variant() {
        let at = TimestampMs::new(1000);
        let events = vec![
            Event::DeviceBonded { device: dev(), at },
            Event::DeviceConnected { device: dev(), at },
            Event::EventCountLoaded {
                device: dev(),
                at,
                total: EventCount::new(120),
            },
            Event::EventsRead {
                device: dev(),
                at,
                range: EventRange::new(EventOffset::zero(), EventOffset::new(50)).unwrap(),
            },
            Event::EventsDelivered {
                device: dev(),
                at,
                range: EventRange::new(EventOffset::zero(), EventOffset::new(50)).unwrap(),
            },
            Event::EventsAcked {
                device: dev(),
                at,
                up_to: EventOffset::new(50),
            },
            Event::Disconnected {
                device: dev(),
                at,
                reason: DisconnectReason::Timeout,
                gatt_code: Some(8),
            },
            Event::RetryScheduled {
                device: dev(),
                at,
                after: at.plus_ms(500),
            },
            Event::SyncCompleted { device: dev(), at },
            Event::SyncFailed {
                device: dev(),
                at,
                reason: DomainError::Protocol("boom".into()),
            },
        ];

        for event in &events {
            assert_eq!(event.device(), &dev());
            assert_eq!(event.at(), at);
            assert!(!event.name().is_empty());
        }
    }

    #[test]
    fn names_are_distinct() {
        let at = TimestampMs::new(0);
        let a = Event::DeviceBonded { device: dev(), at };
        let b = Event::DeviceConnected { device: dev(), at };
        assert_ne!(a.name(), b.name());
    }
}
