//! # ble-sync-engine
//!
//! Actor runtime for BLE-Sync.
//!
//! This crate owns everything the pure core does not: the mailbox, the
//! port contracts, timers, snapshot persistence and backpressure. The
//! decision-making itself lives in `ble-sync-core`; this crate executes
//! what the saga decides.
//!
//! ## Example
//!
//! ```ignore
//! use ble_sync_engine::{EngineConfig, SyncActor, TokioClock};
//!
//! let config = EngineConfig::from_file("engine.toml".as_ref())?;
//! let (actor, handle) = SyncActor::new(
//!     device_id, &config, ble, delivery,
//!     Arc::new(TokioClock::new()), store, telemetry,
//! );
//!
//! tokio::spawn(actor.run());
//! handle.start();
//! ```
//!
//! The [`fakes`] module ships in-memory ports (scripted BLE, virtual
//! clock, memory store, collecting telemetry) so hosts and adapters can
//! test against the engine deterministically.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod actor;
pub mod clock;
pub mod config;
pub mod fakes;
pub mod ports;

pub use actor::{ActorMessage, SyncActor, SyncActorHandle};
pub use clock::TokioClock;
pub use config::{BreakerConfig, ConfigError, EngineConfig, PagingConfig, RetryConfig};
pub use ports::{
    telemetry, BlePort, ClockPort, DeliveryPort, StateStorePort, TelemetryEvent, TelemetryPort,
    TimerCallback, TimerToken,
};
