//! Per-key time windows
//!
//! A `WindowTracker` answers "has this key been seen within the last N
//! milliseconds" and is the timing primitive both batchers build on. Several
//! trackers can be grouped in a `WindowRegistry` so one sweep visits them all.

use super::clock::Clock;
use super::lock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Timestamp table `key -> last seen (ms)` with a fixed window duration
pub struct WindowTracker<K> {
    name: String,
    window_ms: u64,
    clock: Clock,
    entries: Mutex<HashMap<K, u64>>,
}

impl<K: Eq + Hash + Clone> WindowTracker<K> {
    pub fn new(name: impl Into<String>, window: Duration, clock: Clock) -> Self {
        Self {
            name: name.into(),
            window_ms: window.as_millis() as u64,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Lock the table for a multi-step operation
    ///
    /// Batchers hold this guard while touching their own payload maps so the
    /// timestamp and the payload change together.
    pub fn lock(&self) -> WindowGuard<'_, K> {
        WindowGuard {
            entries: lock(&self.entries),
            window_ms: self.window_ms,
            clock: &self.clock,
        }
    }

    /// True when the key starts a new window, false while still inside one
    pub fn should_send_or_start_window(&self, key: &K) -> bool {
        self.lock().should_send_or_start_window(key)
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn sweep(&self) -> usize {
        self.lock().take_expired().len()
    }

    pub fn contains(&self, key: &K) -> bool {
        lock(&self.entries).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Locked view of a `WindowTracker`
pub struct WindowGuard<'a, K> {
    entries: MutexGuard<'a, HashMap<K, u64>>,
    window_ms: u64,
    clock: &'a Clock,
}

impl<'a, K: Eq + Hash + Clone> WindowGuard<'a, K> {
    fn is_expired(&self, last_seen: u64, now: u64) -> bool {
        now.saturating_sub(last_seen) >= self.window_ms
    }

    pub fn should_send_or_start_window(&mut self, key: &K) -> bool {
        let now = self.clock.now_ms();

        match self.entries.get(key).copied() {
            None => {
                self.entries.insert(key.clone(), now);
                true
            }
            Some(last_seen) if !self.is_expired(last_seen, now) => false,
            Some(_) => {
                self.entries.insert(key.clone(), now);
                true
            }
        }
    }

    /// Remove and return the keys whose window has elapsed
    ///
    /// An entry aged exactly the window length counts as expired here, as in
    /// `should_send_or_start_window`, not only once it is strictly older.
    pub fn take_expired(&mut self) -> Vec<K> {
        let now = self.clock.now_ms();
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, last_seen)| self.is_expired(**last_seen, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.remove(key);
        }

        expired
    }

    /// Remove and return every key regardless of expiry
    pub fn drain(&mut self) -> Vec<K> {
        self.entries.drain().map(|(key, _)| key).collect()
    }
}

/// Anything a registry sweep can visit
pub trait Sweepable: Send + Sync {
    fn name(&self) -> &str;

    fn sweep(&self) -> usize;
}

impl<K: Eq + Hash + Clone + Send> Sweepable for WindowTracker<K> {
    fn name(&self) -> &str {
        WindowTracker::name(self)
    }

    fn sweep(&self) -> usize {
        WindowTracker::sweep(self)
    }
}

/// Set of independent trackers swept together
#[derive(Default)]
pub struct WindowRegistry {
    trackers: Vec<Arc<dyn Sweepable>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tracker: Arc<dyn Sweepable>) {
        log::debug!("Registered window table '{}'", tracker.name());
        self.trackers.push(tracker);
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Sweep every registered tracker, returning the total entries dropped
    pub fn sweep(&self) -> usize {
        let mut removed = 0;
        for tracker in &self.trackers {
            let count = tracker.sweep();
            if count > 0 {
                log::debug!("Swept {} expired entries from '{}'", count, tracker.name());
            }
            removed += count;
        }
        removed
    }
}
