//! Commands - intents decided by the saga and executed by the actor.
//!
//! A command is an instruction, not a side effect. The actor interprets
//! each one by invoking a port; the port's result re-enters the mailbox
//! as an [`Event`](crate::Event).

use serde::{Deserialize, Serialize};

use crate::{EventOffset, EventRange, PageSize, RetryReason, TimestampMs};

/// All intents the saga can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Initiate (or verify) bonding with the device.
    BondDevice,
    /// Open a GATT connection.
    ConnectGatt,
    /// Read the device's total event count.
    ReadEventCount,
    /// Read a page of events from the log.
    ReadEvents {
        /// First offset to read.
        offset: EventOffset,
        /// Number of events to request.
        count: PageSize,
    },
    /// Hand a read page to the host application.
    DeliverToApp {
        /// The half-open range to deliver.
        range: EventRange,
    },
    /// Write the acknowledgement high-water mark to the device.
    Acknowledge {
        /// Exclusive upper bound of delivered offsets.
        up_to: EventOffset,
    },
    /// Arm the retry timer.
    ScheduleRetry {
        /// When the retry is due.
        after: TimestampMs,
        /// Why the retry was scheduled.
        reason: RetryReason,
    },
    /// Shut the actor down.
    Stop,
}

impl Command {
    /// Stable snake_case name of the variant, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::BondDevice => "bond_device",
            Command::ConnectGatt => "connect_gatt",
            Command::ReadEventCount => "read_event_count",
            Command::ReadEvents { .. } => "read_events",
            Command::DeliverToApp { .. } => "deliver_to_app",
            Command::Acknowledge { .. } => "acknowledge",
            Command::ScheduleRetry { .. } => "schedule_retry",
            Command::Stop => "stop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_names() {
        let read = Command::ReadEvents {
            offset: EventOffset::new(50),
            count: PageSize::new(50).unwrap(),
        };
        assert_eq!(read.name(), "read_events");
        assert_eq!(Command::Stop.name(), "stop");
    }

    #[test]
    fn commands_compare_structurally() {
        let a = Command::Acknowledge {
            up_to: EventOffset::new(50),
        };
        let b = Command::Acknowledge {
            up_to: EventOffset::new(50),
        };
        assert_eq!(a, b);
    }
}
