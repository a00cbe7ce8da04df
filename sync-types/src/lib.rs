//! # ble-sync-types
//!
//! Foundational types for the BLE-Sync engine.
//!
//! This crate provides the vocabulary shared across all BLE-Sync crates:
//! - [`DeviceId`], [`EventOffset`], [`EventRange`], [`PageSize`] - identity and ordering types
//! - [`Event`] / [`Command`] - the facts and intents the engine trades in
//! - [`DomainError`] - the error taxonomy that drives retry and breaker behaviour
//! - [`SyncSnapshot`] - the minimal durable resume record
//! - [`wire`] - the GATT characteristic payload layout

#![warn(missing_docs)]
#![warn(clippy::all)]

mod commands;
mod error;
mod events;
mod ids;
mod snapshot;
pub mod wire;

pub use commands::Command;
pub use error::{DisconnectReason, DomainError, RetryReason};
pub use events::Event;
pub use ids::{
    AttemptKey, DeviceId, EventCount, EventOffset, EventRange, PageSize, TimestampMs,
};
pub use snapshot::{SnapshotError, SyncSnapshot};
