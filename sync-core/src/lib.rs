//! # ble-sync-core
//!
//! Pure sync logic for BLE-Sync (no I/O, instant tests).
//!
//! This crate implements the decision-making half of the engine without
//! any radio, disk or clock access:
//!
//! - [`SyncAggregate`] + [`Reducer`] - per-device state and event folding
//! - [`SyncSaga`] - the decision table mapping state to commands
//! - [`RetryPolicy`], [`BreakerPolicy`], [`PageSizingPolicy`] - pluggable
//!   timing, gating and sizing policies with deterministic defaults
//!
//! ## Design Philosophy
//!
//! Everything here is **pure**: input in, value out, `now` is always a
//! parameter. The actor runtime in `ble-sync-engine` owns the mailbox
//! and the ports, and interprets the commands these functions produce.
//! That split keeps the hard logic instantly testable - no mocks, no
//! async, no sleeping in tests.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod breaker;
pub mod paging;
pub mod retry;
pub mod saga;

pub use aggregate::{BondStatus, ConnectionStatus, Reducer, SyncAggregate};
pub use breaker::{
    move_to_half_open_if_cooled, BreakerPhase, BreakerPolicy, BreakerState, CountingBreaker,
};
pub use paging::{BoundedPageSizing, PageOutcome, PageSizingPolicy};
pub use retry::{
    ExponentialBackoff, FixedSampler, OsSampler, RetryDecision, RetryPolicy, UniformSampler,
};
pub use saga::SyncSaga;
