//! Millisecond clocks for aggregation windows
//!
//! Windows only ever compare elapsed time, so the clock is monotonic and
//! starts at zero when created. Tests swap in a `ManualClock`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared source of "now" in monotonic milliseconds
#[derive(Clone)]
pub struct Clock {
    now_fn: Arc<dyn Fn() -> u64 + Send + Sync>,
}

impl Clock {
    /// Monotonic clock backed by `Instant`
    pub fn monotonic() -> Self {
        let start = Instant::now();
        Self::from_fn(move || start.elapsed().as_millis() as u64)
    }

    /// Clock driven by an arbitrary function (used for deterministic tests)
    pub fn from_fn(now_fn: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        Self {
            now_fn: Arc::new(now_fn),
        }
    }

    pub fn now_ms(&self) -> u64 {
        (self.now_fn)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::monotonic()
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Clock({}ms)", self.now_ms())
    }
}

/// Hand-advanced clock
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    pub fn clock(&self) -> Clock {
        let now = Arc::clone(&self.now);
        Clock::from_fn(move || now.load(Ordering::SeqCst))
    }
}
