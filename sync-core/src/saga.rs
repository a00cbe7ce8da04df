//! The sync saga - the single source of truth for "what happens next".
//!
//! [`SyncSaga::decide`] is a pure function from (aggregate, last event,
//! now) to an ordered list of commands. It never performs I/O; the actor
//! executes what it returns. Determinism is guaranteed for fixed inputs
//! and fixed policy implementations - tests construct the saga with a
//! zero-jitter retry policy.
//!
//! Decisions follow a strict precedence: bond first, then connect
//! (breaker-gated, with retry backoff), then bootstrap the count, then
//! dispatch on the event that just happened.

use std::sync::Arc;

use ble_sync_types::{AttemptKey, Command, Event, RetryReason, TimestampMs};

use crate::aggregate::{BondStatus, ConnectionStatus, SyncAggregate};
use crate::breaker::BreakerPolicy;
use crate::paging::{PageOutcome, PageSizingPolicy};
use crate::retry::{RetryDecision, RetryPolicy};

/// The decision table driving a device sync.
pub struct SyncSaga {
    retry: Arc<dyn RetryPolicy>,
    breaker: Arc<dyn BreakerPolicy>,
    paging: Arc<dyn PageSizingPolicy>,
}

impl SyncSaga {
    /// Create a saga with the given policies.
    pub fn new(
        retry: Arc<dyn RetryPolicy>,
        breaker: Arc<dyn BreakerPolicy>,
        paging: Arc<dyn PageSizingPolicy>,
    ) -> Self {
        Self {
            retry,
            breaker,
            paging,
        }
    }

    /// Decide the next commands for the current state.
    ///
    /// `last_event` is the event the actor just applied, or `None` on a
    /// cold start.
    pub fn decide(
        &self,
        aggregate: &SyncAggregate,
        last_event: Option<&Event>,
        now: TimestampMs,
    ) -> Vec<Command> {
        if aggregate.bond_status != BondStatus::Bonded {
            return vec![Command::BondDevice];
        }

        if aggregate.connection_status != ConnectionStatus::Connected {
            let reason = if matches!(last_event, Some(Event::Disconnected { .. })) {
                RetryReason::TemporaryGattError
            } else {
                RetryReason::BackoffAfterFailure
            };
            return self.connect_or_back_off(aggregate, now, reason);
        }

        // Nothing observed about the device log yet: bootstrap the count.
        if aggregate.total_on_device.is_zero() && aggregate.last_acked_exclusive.value() == 0 {
            return vec![Command::ReadEventCount];
        }

        match last_event {
            None => vec![Command::ReadEventCount],
            Some(Event::DeviceBonded { .. }) => vec![Command::ConnectGatt],
            Some(Event::DeviceConnected { .. }) => vec![Command::ReadEventCount],
            Some(Event::EventCountLoaded { .. }) => {
                if aggregate.is_fully_acked() {
                    // Caught up; probe again for log growth.
                    vec![Command::ReadEventCount]
                } else {
                    vec![Command::ReadEvents {
                        offset: aggregate.last_acked_exclusive,
                        count: aggregate.page_size,
                    }]
                }
            }
            Some(Event::EventsRead { range, .. }) => vec![Command::DeliverToApp { range: *range }],
            Some(Event::EventsDelivered { range, .. }) => vec![Command::Acknowledge {
                up_to: range.end(),
            }],
            Some(Event::EventsAcked { .. }) => {
                if aggregate.is_fully_acked() {
                    vec![Command::ReadEventCount]
                } else {
                    vec![Command::ReadEvents {
                        offset: aggregate.last_acked_exclusive,
                        count: self.tuned_page_size(aggregate),
                    }]
                }
            }
            Some(Event::Disconnected { .. }) => {
                // Normally unreachable: applying Disconnected leaves the
                // status disconnected, which the check above catches.
                self.connect_or_back_off(aggregate, now, RetryReason::TemporaryGattError)
            }
            Some(_) => vec![],
        }
    }

    fn connect_or_back_off(
        &self,
        aggregate: &SyncAggregate,
        now: TimestampMs,
        reason: RetryReason,
    ) -> Vec<Command> {
        if self
            .breaker
            .is_call_allowed(now, &aggregate.connect_breaker)
        {
            return vec![Command::ConnectGatt];
        }

        let attempts = aggregate.attempts_for(AttemptKey::CONNECT_GATT);
        match self.retry.decide(now, attempts, &reason) {
            RetryDecision::Schedule { at } => vec![Command::ScheduleRetry { after: at, reason }],
            RetryDecision::GiveUp => vec![],
        }
    }

    fn tuned_page_size(&self, aggregate: &SyncAggregate) -> ble_sync_types::PageSize {
        let outcome = if aggregate.last_error.is_none() {
            PageOutcome::Stable
        } else {
            PageOutcome::MostlyStable
        };
        self.paging.next(aggregate.page_size, outcome)
    }
}
