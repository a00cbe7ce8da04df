//! Production clock backed by the tokio timer wheel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ble_sync_types::TimestampMs;

use crate::ports::{ClockPort, TimerCallback, TimerToken};

/// Wall-clock time and spawned sleep timers.
///
/// Must be used from within a tokio runtime; `schedule` spawns a task
/// per timer and `cancel` aborts it.
#[derive(Debug, Default)]
pub struct TokioClock {
    timers: Mutex<HashMap<u64, tokio::task::JoinHandle<()>>>,
    next_token: AtomicU64,
}

impl TokioClock {
    /// Create a clock.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClockPort for TokioClock {
    fn now(&self) -> TimestampMs {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis().min(i64::MAX as u128) as i64)
            .unwrap_or(0);
        TimestampMs::new(millis)
    }

    fn schedule(&self, at: TimestampMs, on_fire: TimerCallback) -> TimerToken {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let delay = at.since(self.now()).max(0) as u64;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            on_fire();
        });

        let mut timers = self.timers.lock().expect("timer map poisoned");
        timers.retain(|_, handle| !handle.is_finished());
        timers.insert(token, handle);
        TimerToken(token)
    }

    fn cancel(&self, token: TimerToken) {
        let handle = {
            let mut timers = self.timers.lock().expect("timer map poisoned");
            timers.remove(&token.0)
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}
