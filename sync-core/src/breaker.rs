//! Circuit breaker for per-stage call gating.
//!
//! A breaker is a three-phase gate (Closed / Open / HalfOpen) that
//! throttles calls to a stage after failures. The state lives in the
//! aggregate; the policy computes transitions. Both sides are pure -
//! `now` is always a parameter, never a clock read.

use ble_sync_types::{DomainError, TimestampMs};

/// The three phases of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerPhase {
    /// Calls flow freely.
    Closed,
    /// Calls are denied until the cool-down elapses.
    Open,
    /// One probe call is allowed; its outcome decides the next phase.
    HalfOpen,
}

/// Breaker state for one stage (bond, connect, read, deliver, ack).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerState {
    /// Current phase.
    pub phase: BreakerPhase,
    /// When the breaker opened, if it is or was open.
    pub opened_at: Option<TimestampMs>,
    /// The failure that drove the last transition.
    pub last_failure: Option<DomainError>,
}

impl BreakerState {
    /// A closed breaker with no recorded failure.
    pub fn closed() -> Self {
        Self {
            phase: BreakerPhase::Closed,
            opened_at: None,
            last_failure: None,
        }
    }

    /// An open breaker, opened at `now` by `error`.
    pub fn opened(now: TimestampMs, error: DomainError) -> Self {
        Self {
            phase: BreakerPhase::Open,
            opened_at: Some(now),
            last_failure: Some(error),
        }
    }

    /// Check whether the breaker is closed.
    pub fn is_closed(&self) -> bool {
        self.phase == BreakerPhase::Closed
    }
}

impl Default for BreakerState {
    fn default() -> Self {
        Self::closed()
    }
}

/// Pure breaker transition policy.
pub trait BreakerPolicy: Send + Sync {
    /// Whether a call through this breaker is currently allowed.
    fn is_call_allowed(&self, now: TimestampMs, state: &BreakerState) -> bool;

    /// The state after a successful call.
    fn on_success(&self, now: TimestampMs, state: &BreakerState) -> BreakerState;

    /// The state after a failed call.
    fn on_failure(
        &self,
        now: TimestampMs,
        state: &BreakerState,
        error: &DomainError,
    ) -> BreakerState;
}

/// The default breaker: opens after a failure, denies calls during a
/// cool-down window, then lets probes through.
#[derive(Debug, Clone)]
pub struct CountingBreaker {
    failures_to_open: u32,
    cool_down_ms: u64,
}

impl CountingBreaker {
    /// Create a breaker. `failures_to_open` is clamped to at least 1.
    pub fn new(failures_to_open: u32, cool_down_ms: u64) -> Self {
        Self {
            failures_to_open: failures_to_open.max(1),
            cool_down_ms,
        }
    }

    /// The configured cool-down window.
    pub fn cool_down_ms(&self) -> u64 {
        self.cool_down_ms
    }
}

impl Default for CountingBreaker {
    fn default() -> Self {
        Self::new(1, 30_000)
    }
}

impl BreakerPolicy for CountingBreaker {
    fn is_call_allowed(&self, now: TimestampMs, state: &BreakerState) -> bool {
        match state.phase {
            BreakerPhase::Closed | BreakerPhase::HalfOpen => true,
            BreakerPhase::Open => state
                .opened_at
                .map_or(true, |opened| now.since(opened) >= self.cool_down_ms as i64),
        }
    }

    fn on_success(&self, _now: TimestampMs, _state: &BreakerState) -> BreakerState {
        BreakerState::closed()
    }

    fn on_failure(
        &self,
        now: TimestampMs,
        state: &BreakerState,
        error: &DomainError,
    ) -> BreakerState {
        match state.phase {
            BreakerPhase::Closed => {
                if self.failures_to_open <= 1 {
                    BreakerState::opened(now, error.clone())
                } else {
                    BreakerState {
                        phase: BreakerPhase::Closed,
                        opened_at: state.opened_at,
                        last_failure: Some(error.clone()),
                    }
                }
            }
            // The caller pushed through an open breaker anyway; restart
            // the cool-down.
            BreakerPhase::Open => BreakerState::opened(now, error.clone()),
            BreakerPhase::HalfOpen => BreakerState::opened(now, error.clone()),
        }
    }
}

/// Transition an open breaker to half-open once its cool-down elapsed.
///
/// Any other phase (or an open breaker still cooling) is returned
/// unchanged.
pub fn move_to_half_open_if_cooled(
    now: TimestampMs,
    state: &BreakerState,
    cool_down_ms: u64,
) -> BreakerState {
    match (state.phase, state.opened_at) {
        (BreakerPhase::Open, Some(opened)) if now.since(opened) >= cool_down_ms as i64 => {
            BreakerState {
                phase: BreakerPhase::HalfOpen,
                opened_at: state.opened_at,
                last_failure: state.last_failure.clone(),
            }
        }
        _ => state.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport_err() -> DomainError {
        DomainError::Transport {
            message: "link lost".into(),
            code: Some(8),
        }
    }

    #[test]
    fn closed_breaker_allows_calls() {
        let breaker = CountingBreaker::new(1, 1000);
        let state = BreakerState::closed();
        assert!(breaker.is_call_allowed(TimestampMs::new(0), &state));
    }

    #[test]
    fn single_failure_opens_with_threshold_one() {
        let breaker = CountingBreaker::new(1, 1000);
        let state = breaker.on_failure(TimestampMs::new(5000), &BreakerState::closed(), &transport_err());

        assert_eq!(state.phase, BreakerPhase::Open);
        assert_eq!(state.opened_at, Some(TimestampMs::new(5000)));
        assert_eq!(state.last_failure, Some(transport_err()));
    }

    #[test]
    fn higher_threshold_records_failure_but_stays_closed() {
        let breaker = CountingBreaker::new(3, 1000);
        let state = breaker.on_failure(TimestampMs::new(5000), &BreakerState::closed(), &transport_err());

        assert_eq!(state.phase, BreakerPhase::Closed);
        assert_eq!(state.last_failure, Some(transport_err()));
    }

    #[test]
    fn open_breaker_denies_until_cooled() {
        let breaker = CountingBreaker::new(1, 1000);
        let state = BreakerState::opened(TimestampMs::new(4500), transport_err());

        assert!(!breaker.is_call_allowed(TimestampMs::new(5000), &state));
        assert!(breaker.is_call_allowed(TimestampMs::new(5500), &state));
        assert!(breaker.is_call_allowed(TimestampMs::new(9000), &state));
    }

    #[test]
    fn failure_while_open_restarts_cool_down() {
        let breaker = CountingBreaker::new(1, 1000);
        let state = BreakerState::opened(TimestampMs::new(1000), transport_err());

        let state = breaker.on_failure(TimestampMs::new(2500), &state, &transport_err());

        assert_eq!(state.phase, BreakerPhase::Open);
        assert_eq!(state.opened_at, Some(TimestampMs::new(2500)));
    }

    #[test]
    fn success_closes_from_any_phase() {
        let breaker = CountingBreaker::new(1, 1000);
        let now = TimestampMs::new(9000);

        for state in [
            BreakerState::closed(),
            BreakerState::opened(TimestampMs::new(1000), transport_err()),
            move_to_half_open_if_cooled(
                now,
                &BreakerState::opened(TimestampMs::new(1000), transport_err()),
                1000,
            ),
        ] {
            let closed = breaker.on_success(now, &state);
            assert_eq!(closed, BreakerState::closed());
        }
    }

    #[test]
    fn half_open_probe_failure_reopens() {
        let breaker = CountingBreaker::new(1, 1000);
        let open = BreakerState::opened(TimestampMs::new(1000), transport_err());
        let half_open = move_to_half_open_if_cooled(TimestampMs::new(2500), &open, 1000);
        assert_eq!(half_open.phase, BreakerPhase::HalfOpen);

        let reopened = breaker.on_failure(TimestampMs::new(2600), &half_open, &transport_err());

        assert_eq!(reopened.phase, BreakerPhase::Open);
        assert_eq!(reopened.opened_at, Some(TimestampMs::new(2600)));
    }

    #[test]
    fn half_open_requires_elapsed_cool_down() {
        let open = BreakerState::opened(TimestampMs::new(1000), transport_err());

        let still_open = move_to_half_open_if_cooled(TimestampMs::new(1500), &open, 1000);
        assert_eq!(still_open.phase, BreakerPhase::Open);

        let half_open = move_to_half_open_if_cooled(TimestampMs::new(2000), &open, 1000);
        assert_eq!(half_open.phase, BreakerPhase::HalfOpen);
    }

    #[test]
    fn threshold_is_clamped_to_one() {
        let breaker = CountingBreaker::new(0, 1000);
        let state = breaker.on_failure(TimestampMs::new(0), &BreakerState::closed(), &transport_err());
        assert_eq!(state.phase, BreakerPhase::Open);
    }
}
