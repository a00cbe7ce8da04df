//! Identity and ordering types for BLE-Sync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Identifies a peripheral device.
///
/// An opaque, non-empty string (platform MAC, UUID, whatever the radio
/// layer hands out). Used as the key for persisted sync state.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a DeviceId. Returns `None` for an empty string.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({})", self.0)
    }
}

/// A position in a device's append-only event log.
///
/// Offsets are non-negative and advance monotonically as events are
/// acknowledged. The exclusive high-water mark of durably delivered
/// events is an offset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct EventOffset(u64);

impl EventOffset {
    /// Create an offset with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Offset zero, the start of the log.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the numeric value of this offset.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Add<EventCount> for EventOffset {
    type Output = EventOffset;

    fn add(self, count: EventCount) -> EventOffset {
        EventOffset(self.0.saturating_add(count.value()))
    }
}

impl fmt::Display for EventOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EventOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventOffset({})", self.0)
    }
}

/// A count of events.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct EventCount(u64);

impl EventCount {
    /// Create a count with the given value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The zero count.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Get the numeric value of this count.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Check whether this count is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EventCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EventCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventCount({})", self.0)
    }
}

/// The number of events requested in a single page read.
///
/// Strictly positive; a zero-sized read is unrepresentable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageSize(u32);

impl PageSize {
    /// Create a page size. Returns `None` for zero.
    pub fn new(value: u32) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Get the numeric value of this page size.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageSize({})", self.0)
    }
}

/// Milliseconds since the Unix epoch.
///
/// The engine never reads a wall clock directly; every timestamp comes
/// in through the clock port or rides on an event, so tests can use a
/// virtual clock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct TimestampMs(i64);

impl TimestampMs {
    /// Create a timestamp with the given epoch-millisecond value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the numeric value of this timestamp.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// This timestamp advanced by `ms` milliseconds.
    pub fn plus_ms(&self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms.min(i64::MAX as u64) as i64))
    }

    /// Milliseconds elapsed since `earlier` (negative if `earlier` is in
    /// the future).
    pub fn since(&self, earlier: TimestampMs) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for TimestampMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TimestampMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimestampMs({})", self.0)
    }
}

/// A half-open range `[start, end)` of log offsets.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRange {
    start: EventOffset,
    end: EventOffset,
}

impl EventRange {
    /// Create a range. Returns `None` if `end < start`.
    pub fn new(start: EventOffset, end: EventOffset) -> Option<Self> {
        if end < start {
            None
        } else {
            Some(Self { start, end })
        }
    }

    /// The range covering `count` events starting at `start`.
    pub fn from_count(start: EventOffset, count: PageSize) -> Self {
        Self {
            start,
            end: start + EventCount::new(count.value() as u64),
        }
    }

    /// The inclusive start offset.
    pub fn start(&self) -> EventOffset {
        self.start
    }

    /// The exclusive end offset.
    pub fn end(&self) -> EventOffset {
        self.end
    }

    /// The number of offsets covered by this range.
    pub fn count(&self) -> EventCount {
        EventCount::new(self.end.value() - self.start.value())
    }

    /// Check whether the range covers no offsets.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for EventRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl fmt::Debug for EventRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventRange[{}, {})", self.start, self.end)
    }
}

/// Label for an operation family, used to bucket attempt counters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptKey(&'static str);

impl AttemptKey {
    /// Bonding attempts.
    pub const BOND_DEVICE: AttemptKey = AttemptKey("BondDevice");
    /// GATT connection attempts.
    pub const CONNECT_GATT: AttemptKey = AttemptKey("ConnectGatt");

    /// Create a key for a custom operation family.
    pub const fn custom(label: &'static str) -> Self {
        Self(label)
    }

    /// Get the label of this key.
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttemptKey({})", self.0)
    }
}
