//! # Activity aggregation engine
//!
//! Turns a high-rate stream of fine-grained change events into coarser
//! ActivityStreams notifications.
//!
//! Per incoming event the engine either:
//! 1. forwards it immediately (feature off, event outside the allow-list,
//!    or data too incomplete to batch),
//! 2. suppresses it because the same resource was just reported, or
//! 3. buffers it into a batch flushed as one notification once its window
//!    elapses, or when the process shuts down.
//!
//! ## Module Organization
//!
//! - `clock` - injectable millisecond clock (`ManualClock` for tests)
//! - `types` - aggregation keys, resource descriptors, event classification
//! - `window` - per-key window table (`WindowTracker`) and `WindowRegistry`
//! - `merging` - document activities merged per (actor, verb, parent folder)
//! - `tagging` - tag edits netted per (resource, actor)
//! - `coordinator` - event routing, flush and shutdown
//! - `scheduler` - background sweep task
//! - `config` - environment configuration

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod merging;
pub mod scheduler;
pub mod tagging;
pub mod types;
pub mod window;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use clock::{Clock, ManualClock};
pub use config::AggregationConfig;
pub use coordinator::AggregationCoordinator;
pub use merging::{MergingBatcher, Submission};
pub use tagging::{TagBatcher, TagEdits};
pub use types::{AggregationKey, EventCategory, ResourceDescriptor, TagOp};
pub use window::{WindowRegistry, WindowTracker};

/// Lock a map, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
