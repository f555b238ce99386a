//! Merging of document activities per (actor, verb, parent folder)
//!
//! Bursts of create/update/remove/delete activities in one folder by one
//! actor are buffered and flushed as a single activity once the window for
//! that key elapses: the lone object for a bucket of one, a synthetic
//! "N documents" collection otherwise.

use super::clock::Clock;
use super::lock;
use super::types::AggregationKey;
use super::window::WindowTracker;
use crate::activity::{parent_path, Activity, ActivityObject};
use crate::dispatch::Dispatcher;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Verbs that take part in merging; each has its own window and bucket table
pub const MERGE_VERBS: [&str; 4] = ["add", "update", "remove", "delete"];

/// Outcome of `MergingBatcher::submit`
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// Buffered until the window of its key elapses
    Buffered,
    /// Not mergeable, the caller must forward it now
    Bypass(Activity),
}

/// One bucket removed from the batcher, ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFlush {
    pub verb: &'static str,
    pub key: AggregationKey,
    pub objects: Vec<ActivityObject>,
}

impl PendingFlush {
    /// Consolidated activity for this bucket
    pub fn into_activity(self, actor: ActivityObject, generator: Option<ActivityObject>) -> Activity {
        let target = ActivityObject::folder(&self.key.scope);

        let object = if self.objects.len() == 1 {
            self.objects.into_iter().next().unwrap_or_default()
        } else {
            ActivityObject::document_collection(&self.objects)
        };

        Activity::new(self.verb)
            .with_actor(actor)
            .with_object(object)
            .with_target(target)
            .with_generator(generator)
    }
}

struct VerbBuckets {
    verb: &'static str,
    windows: WindowTracker<AggregationKey>,
    pending: Mutex<HashMap<AggregationKey, Vec<ActivityObject>>>,
}

impl VerbBuckets {
    /// Lock order: window table, then bucket table
    fn take(&self, all: bool) -> Vec<PendingFlush> {
        let mut windows = self.windows.lock();
        let mut pending = lock(&self.pending);

        let keys = if all { windows.drain() } else { windows.take_expired() };
        let mut flushes = Vec::with_capacity(keys.len());

        for key in keys {
            match pending.remove(&key) {
                Some(objects) if !objects.is_empty() => flushes.push(PendingFlush {
                    verb: self.verb,
                    key,
                    objects,
                }),
                _ => log::warn!("⚠️  '{}' window for {} closed without buffered documents", self.verb, key),
            }
        }

        if all {
            for (key, objects) in pending.drain() {
                log::warn!("⚠️  '{}' bucket for {} had no window, flushing anyway", self.verb, key);
                if !objects.is_empty() {
                    flushes.push(PendingFlush {
                        verb: self.verb,
                        key,
                        objects,
                    });
                }
            }
        }

        flushes
    }
}

pub struct MergingBatcher {
    buckets: Vec<VerbBuckets>,
}

impl MergingBatcher {
    pub fn new(window: Duration, clock: Clock) -> Self {
        let buckets = MERGE_VERBS
            .iter()
            .map(|&verb| VerbBuckets {
                verb,
                windows: WindowTracker::new(format!("merge:{}", verb), window, clock.clone()),
                pending: Mutex::new(HashMap::new()),
            })
            .collect();

        Self { buckets }
    }

    fn bucket(&self, verb: &str) -> Option<&VerbBuckets> {
        self.buckets.iter().find(|b| b.verb == verb)
    }

    /// Buffer a document activity, or hand it back when it cannot be merged
    pub fn submit(&self, activity: Activity, actor_id: &str) -> Submission {
        let Some(bucket) = self.bucket(&activity.verb) else {
            return Submission::Bypass(activity);
        };

        let scope = match &activity.object {
            Some(object) if object.id.is_some() && !actor_id.is_empty() => {
                object.url.as_deref().and_then(parent_path).map(str::to_string)
            }
            _ => None,
        };

        let Some(scope) = scope else {
            log::debug!("Activity '{}' by {} lacks merge fields, forwarding", activity.verb, actor_id);
            return Submission::Bypass(activity);
        };

        let object = activity.object.unwrap_or_default();

        let key = AggregationKey::new(actor_id, scope);

        let mut windows = bucket.windows.lock();
        let mut pending = lock(&bucket.pending);
        pending.entry(key.clone()).or_default().push(object);
        windows.should_send_or_start_window(&key);

        Submission::Buffered
    }

    /// Remove buckets whose window elapsed
    pub fn take_expired(&self) -> Vec<PendingFlush> {
        self.buckets.iter().flat_map(|b| b.take(false)).collect()
    }

    /// Remove every bucket regardless of expiry
    pub fn take_all(&self) -> Vec<PendingFlush> {
        self.buckets.iter().flat_map(|b| b.take(true)).collect()
    }

    /// Number of open buckets across all verbs
    pub fn pending_batches(&self) -> usize {
        self.buckets.iter().map(|b| lock(&b.pending).len()).sum()
    }

    /// Send one activity per expired bucket; returns the number sent
    pub async fn flush_expired(&self, dispatcher: &Dispatcher) -> usize {
        let flushes = self.take_expired();
        Self::send(flushes, dispatcher).await
    }

    /// Send every open bucket (shutdown); returns the number sent
    pub async fn drain_all(&self, dispatcher: &Dispatcher) -> usize {
        let flushes = self.take_all();
        Self::send(flushes, dispatcher).await
    }

    async fn send(flushes: Vec<PendingFlush>, dispatcher: &Dispatcher) -> usize {
        let mut sent = 0;

        for flush in flushes {
            log::debug!(
                "⏰ Merged '{}' window closed for {} ({} documents)",
                flush.verb,
                flush.key,
                flush.objects.len()
            );

            let user = flush.key.actor.clone();
            let actor = dispatcher.actor_for(&user).await;
            let activity = flush.into_activity(actor, dispatcher.generator().cloned());

            dispatcher.deliver(&activity, &user).await;
            sent += 1;
        }

        sent
    }
}
