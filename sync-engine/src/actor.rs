//! The per-device sync actor.
//!
//! One actor per device, one consumer per mailbox. The actor applies
//! every incoming event through the pure reducer, asks the saga for the
//! next commands, and executes them inline against the ports. Each port
//! call returns an event which is posted back to the mailbox - never
//! applied directly - so the mailbox stays the single linearization
//! point.
//!
//! The actor owns two pieces of runtime-only state the domain does not
//! track: the pending retry timer (at most one) and the read
//! backpressure flag (at most one page read in flight).

use std::sync::Arc;

use ble_sync_core::{OsSampler, Reducer, SyncAggregate, SyncSaga, UniformSampler};
use ble_sync_core::BreakerPolicy;
use ble_sync_types::{Command, DeviceId, Event, SyncSnapshot};
use tokio::sync::mpsc;

use crate::config::EngineConfig;
use crate::ports::{
    telemetry, BlePort, ClockPort, DeliveryPort, StateStorePort, TelemetryEvent, TelemetryPort,
    TimerToken,
};

/// Messages accepted by the actor mailbox.
#[derive(Debug)]
pub enum ActorMessage {
    /// Bootstrap: restore the snapshot, run the first saga decision.
    Start,
    /// A domain event from a port or the outside world.
    Domain(Event),
    /// The pending retry timer fired.
    TimerFired,
    /// Cancel the pending timer and shut down.
    Stop,
}

/// Cloneable handle for posting into an actor's mailbox.
///
/// Posting may happen from any context (timer callbacks included);
/// draining must not - the actor is the only consumer.
#[derive(Clone)]
pub struct SyncActorHandle {
    tx: mpsc::UnboundedSender<ActorMessage>,
}

impl SyncActorHandle {
    /// Ask the actor to bootstrap.
    pub fn start(&self) {
        let _ = self.tx.send(ActorMessage::Start);
    }

    /// Deliver a domain event observed outside the actor.
    pub fn post(&self, event: Event) {
        let _ = self.tx.send(ActorMessage::Domain(event));
    }

    /// Ask the actor to shut down after the current message.
    pub fn stop(&self) {
        let _ = self.tx.send(ActorMessage::Stop);
    }
}

/// The single-threaded mailbox consumer driving one device's sync.
pub struct SyncActor {
    aggregate: SyncAggregate,
    reducer: Reducer,
    saga: SyncSaga,
    ble: Arc<dyn BlePort>,
    delivery: Arc<dyn DeliveryPort>,
    clock: Arc<dyn ClockPort>,
    store: Arc<dyn StateStorePort>,
    telemetry: Arc<dyn TelemetryPort>,
    tx: mpsc::UnboundedSender<ActorMessage>,
    rx: mpsc::UnboundedReceiver<ActorMessage>,
    retry_token: Option<TimerToken>,
    read_in_flight: bool,
}

impl SyncActor {
    /// Create an actor and its handle, drawing jitter from the OS.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: DeviceId,
        config: &EngineConfig,
        ble: Arc<dyn BlePort>,
        delivery: Arc<dyn DeliveryPort>,
        clock: Arc<dyn ClockPort>,
        store: Arc<dyn StateStorePort>,
        telemetry: Arc<dyn TelemetryPort>,
    ) -> (Self, SyncActorHandle) {
        Self::with_sampler(
            device,
            config,
            Arc::new(OsSampler),
            ble,
            delivery,
            clock,
            store,
            telemetry,
        )
    }

    /// Create an actor with an explicit jitter sampler (tests pin it).
    #[allow(clippy::too_many_arguments)]
    pub fn with_sampler(
        device: DeviceId,
        config: &EngineConfig,
        sampler: Arc<dyn UniformSampler>,
        ble: Arc<dyn BlePort>,
        delivery: Arc<dyn DeliveryPort>,
        clock: Arc<dyn ClockPort>,
        store: Arc<dyn StateStorePort>,
        telemetry: Arc<dyn TelemetryPort>,
    ) -> (Self, SyncActorHandle) {
        let breaker: Arc<dyn BreakerPolicy> = Arc::new(config.breaker.build());
        let reducer = Reducer::new(Arc::clone(&breaker));
        let saga = SyncSaga::new(
            Arc::new(config.retry.build(sampler)),
            breaker,
            Arc::new(config.paging.build()),
        );
        let aggregate = SyncAggregate::new(device, config.paging.initial_page_size());

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SyncActorHandle { tx: tx.clone() };
        let actor = Self {
            aggregate,
            reducer,
            saga,
            ble,
            delivery,
            clock,
            store,
            telemetry,
            tx,
            rx,
            retry_token: None,
            read_in_flight: false,
        };
        (actor, handle)
    }

    /// The current aggregate, for observability.
    pub fn aggregate(&self) -> &SyncAggregate {
        &self.aggregate
    }

    /// Consume the mailbox until a `Stop` message arrives.
    pub async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            if !self.handle(message).await {
                break;
            }
        }
        tracing::info!(device = %self.aggregate.device, "sync actor stopped");
    }

    /// Process already-queued messages until the mailbox is empty.
    ///
    /// Returns `false` if a `Stop` was processed. With scripted ports
    /// and a virtual clock this makes runtime behaviour fully
    /// deterministic: post, drain, advance the clock, drain again.
    pub async fn run_until_idle(&mut self) -> bool {
        while let Ok(message) = self.rx.try_recv() {
            if !self.handle(message).await {
                return false;
            }
        }
        true
    }

    async fn handle(&mut self, message: ActorMessage) -> bool {
        match message {
            ActorMessage::Start => {
                self.bootstrap().await;
                true
            }
            ActorMessage::Domain(event) => {
                self.on_event(event).await;
                true
            }
            ActorMessage::TimerFired => {
                // Idempotent: a fire that raced a cancellation is just
                // another chance for the saga to re-decide.
                self.retry_token = None;
                let now = self.clock.now();
                let synthetic = Event::RetryScheduled {
                    device: self.aggregate.device.clone(),
                    at: now,
                    after: now,
                };
                self.aggregate = self.reducer.apply(&self.aggregate, &synthetic);
                self.decide_and_execute(Some(&synthetic)).await;
                true
            }
            ActorMessage::Stop => {
                if let Some(token) = self.retry_token.take() {
                    self.clock.cancel(token);
                }
                false
            }
        }
    }

    async fn bootstrap(&mut self) {
        if let Some(snapshot) = self.store.read(&self.aggregate.device).await {
            tracing::info!(
                device = %self.aggregate.device,
                acked = %snapshot.last_acked_exclusive,
                page_size = %snapshot.page_size,
                "restored snapshot"
            );
            self.telemetry.emit(
                TelemetryEvent::new(
                    telemetry::SNAPSHOT_RESTORED,
                    self.clock.now(),
                    self.aggregate.device.clone(),
                )
                .with("acked", snapshot.last_acked_exclusive)
                .with("page_size", snapshot.page_size)
                .with("cursor", &snapshot.saga_cursor),
            );
            self.aggregate = self.aggregate.clone().restore(&snapshot);
        }
        self.decide_and_execute(None).await;
    }

    async fn on_event(&mut self, event: Event) {
        tracing::debug!(device = %self.aggregate.device, event = event.name(), "applying event");
        self.aggregate = self.reducer.apply(&self.aggregate, &event);

        match &event {
            Event::EventsRead { .. } => {
                // Normally set before the port call; kept in sync for
                // externally posted read events too.
                self.read_in_flight = true;
            }
            Event::EventsAcked { .. } => {
                if !self.aggregate.has_in_flight() {
                    self.read_in_flight = false;
                }
                self.snapshot("acked").await;
            }
            Event::Disconnected { .. } => {
                // The link is gone; nothing can still be in flight.
                self.read_in_flight = false;
                self.snapshot("disconnected").await;
            }
            Event::SyncFailed { reason, .. } => {
                tracing::warn!(device = %self.aggregate.device, error = %reason, "sync failed");
                self.telemetry.emit(
                    TelemetryEvent::new(
                        telemetry::SYNC_FAILED,
                        self.clock.now(),
                        self.aggregate.device.clone(),
                    )
                    .with("reason", reason),
                );
            }
            _ => {}
        }

        self.decide_and_execute(Some(&event)).await;
    }

    async fn decide_and_execute(&mut self, last_event: Option<&Event>) {
        let commands = self
            .saga
            .decide(&self.aggregate, last_event, self.clock.now());
        for command in commands {
            self.execute(command).await;
        }
    }

    async fn execute(&mut self, command: Command) {
        tracing::debug!(device = %self.aggregate.device, command = command.name(), "executing");
        match command {
            Command::BondDevice => {
                let event = self.ble.bond(&self.aggregate.device).await;
                self.post(event);
            }
            Command::ConnectGatt => {
                let event = self.ble.connect(&self.aggregate.device).await;
                self.post(event);
            }
            Command::ReadEventCount => {
                let event = self.ble.read_count(&self.aggregate.device).await;
                self.post(event);
            }
            Command::ReadEvents { offset, count } => {
                if self.read_in_flight {
                    tracing::debug!(
                        device = %self.aggregate.device,
                        %offset,
                        "page read dropped, one already in flight"
                    );
                    self.telemetry.emit(
                        TelemetryEvent::new(
                            telemetry::READ_SKIPPED_BACKPRESSURE,
                            self.clock.now(),
                            self.aggregate.device.clone(),
                        )
                        .with("offset", offset),
                    );
                    return;
                }
                self.read_in_flight = true;
                let event = self
                    .ble
                    .read_page(&self.aggregate.device, offset, count)
                    .await;
                if !matches!(event, Event::EventsRead { .. }) {
                    // The read never materialized; don't hold the slot.
                    self.read_in_flight = false;
                }
                self.post(event);
            }
            Command::DeliverToApp { range } => {
                let event = self.delivery.deliver(&self.aggregate.device, range).await;
                self.post(event);
            }
            Command::Acknowledge { up_to } => {
                let event = self.ble.ack(&self.aggregate.device, up_to).await;
                self.post(event);
            }
            Command::ScheduleRetry { after, reason } => {
                if let Some(token) = self.retry_token.take() {
                    self.clock.cancel(token);
                }
                let tx = self.tx.clone();
                let token = self.clock.schedule(
                    after,
                    Box::new(move || {
                        let _ = tx.send(ActorMessage::TimerFired);
                    }),
                );
                self.retry_token = Some(token);
                tracing::debug!(device = %self.aggregate.device, %after, %reason, "retry scheduled");
                self.telemetry.emit(
                    TelemetryEvent::new(
                        telemetry::RETRY_SCHEDULED,
                        self.clock.now(),
                        self.aggregate.device.clone(),
                    )
                    .with("after", after)
                    .with("reason", reason),
                );
            }
            Command::Stop => {
                let _ = self.tx.send(ActorMessage::Stop);
            }
        }
    }

    fn post(&self, event: Event) {
        let _ = self.tx.send(ActorMessage::Domain(event));
    }

    async fn snapshot(&mut self, reason: &str) {
        let snapshot = SyncSnapshot::new(
            self.aggregate.device.clone(),
            self.aggregate.last_acked_exclusive,
            self.aggregate.page_size,
            self.aggregate.saga_cursor.clone(),
        );
        self.store.write(snapshot).await;
        tracing::debug!(
            device = %self.aggregate.device,
            reason,
            acked = %self.aggregate.last_acked_exclusive,
            "snapshot saved"
        );
        self.telemetry.emit(
            TelemetryEvent::new(
                telemetry::SNAPSHOT_SAVED,
                self.clock.now(),
                self.aggregate.device.clone(),
            )
            .with("reason", reason)
            .with("acked", self.aggregate.last_acked_exclusive)
            .with("page_size", self.aggregate.page_size)
            .with("cursor", &self.aggregate.saga_cursor),
        );
    }
}
