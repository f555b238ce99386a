//! Event routing, periodic flush and shutdown drain
//!
//! The coordinator is the only entry point of the engine. It decides per
//! event whether to forward, suppress or buffer, owns the background sweep,
//! and drains every batch on shutdown.

use super::clock::Clock;
use super::config::AggregationConfig;
use super::merging::{MergingBatcher, Submission};
use super::scheduler::{self, SweepHandle};
use super::tagging::{TagBatcher, TagEdits, TagFlush};
use super::types::{AggregationKey, EventCategory, ResourceDescriptor, TagOp};
use super::window::{WindowRegistry, WindowTracker};
use super::lock;
use crate::activity::Activity;
use crate::dispatch::Dispatcher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub struct AggregationCoordinator {
    config: AggregationConfig,
    dispatcher: Arc<Dispatcher>,
    merging: MergingBatcher,
    tags: TagBatcher,
    /// Per-resource suppression of create/modify/security events
    updates: Arc<WindowTracker<String>>,
    /// Per-resource suppression of publication requests
    publications: Arc<WindowTracker<String>>,
    registry: WindowRegistry,
    /// Serializes sweep passes with the shutdown drain
    sweep_gate: tokio::sync::Mutex<()>,
    sweep_task: Mutex<Option<SweepHandle>>,
    shut_down: AtomicBool,
}

impl AggregationCoordinator {
    pub fn new(config: AggregationConfig, dispatcher: Arc<Dispatcher>, clock: Clock) -> Self {
        let updates = Arc::new(WindowTracker::new("updates", config.window(), clock.clone()));
        let publications = Arc::new(WindowTracker::new("publications", config.window(), clock.clone()));

        let mut registry = WindowRegistry::new();
        registry.register(updates.clone());
        registry.register(publications.clone());

        Self {
            merging: MergingBatcher::new(config.window(), clock.clone()),
            tags: TagBatcher::new(config.tag_window(), clock),
            config,
            dispatcher,
            updates,
            publications,
            registry,
            sweep_gate: tokio::sync::Mutex::new(()),
            sweep_task: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Open merged buckets across all verbs
    pub fn pending_batches(&self) -> usize {
        self.merging.pending_batches()
    }

    /// Tag keys with a live window
    pub fn pending_tag_keys(&self) -> usize {
        self.tags.pending_keys()
    }

    /// Spawn the periodic sweep; no-op when disabled, running or shut down
    pub fn start(self: &Arc<Self>) {
        if !self.config.enabled {
            log::info!("ℹ️  Activity aggregation disabled, notifications are forwarded as they come");
            return;
        }

        // shutdown flips the flag under this lock, so the check below is final
        let mut sweep_task = lock(&self.sweep_task);
        if self.is_shut_down() {
            log::warn!("⚠️  Coordinator already shut down, sweep not started");
            return;
        }
        if sweep_task.is_some() {
            return;
        }

        log::info!(
            "✅ Activity aggregation enabled (window: {}ms, tags: {}ms)",
            self.config.window_ms,
            self.config.tag_window_ms
        );
        *sweep_task = Some(scheduler::spawn_sweep(Arc::downgrade(self), self.config.sweep_interval()));
    }

    /// Entry point for translated notifications
    ///
    /// Mergeable document activities are buffered; everything else, and
    /// everything while aggregation is off, is sent right away.
    pub async fn submit_notification(&self, activity: Activity, actor_id: &str) {
        if !self.config.enabled || self.is_shut_down() {
            self.dispatcher.deliver(&activity, actor_id).await;
            return;
        }

        match self.merging.submit(activity, actor_id) {
            Submission::Buffered => {
                // raced with shutdown: its drain may already have run
                if self.is_shut_down() {
                    self.merging.drain_all(&self.dispatcher).await;
                }
            }
            Submission::Bypass(activity) => {
                self.dispatcher.deliver(&activity, actor_id).await;
            }
        }
    }

    /// Decide whether a raw event should go on to translation and sending
    ///
    /// Returns false when the event is suppressed or absorbed by a batch.
    pub async fn evaluate_for_aggregation(
        &self,
        event_type: &str,
        resource: &ResourceDescriptor,
        actor_id: &str,
    ) -> bool {
        if !self.config.enabled {
            return true;
        }

        match EventCategory::classify(event_type, &resource.doc_type) {
            EventCategory::Passthrough => true,
            EventCategory::Update => self.check_resource_window(&self.updates, resource, event_type),
            EventCategory::Publication => self.check_resource_window(&self.publications, resource, event_type),
            EventCategory::TagUpdate => {
                self.tags.touch(resource.series_id(), actor_id);
                self.drain_tags_after_shutdown().await;
                false
            }
            EventCategory::TagRelation(op) => {
                self.route_tag_relation(op, resource, actor_id).await;
                false
            }
        }
    }

    fn check_resource_window(
        &self,
        tracker: &WindowTracker<String>,
        resource: &ResourceDescriptor,
        event_type: &str,
    ) -> bool {
        let forward = tracker.should_send_or_start_window(&resource.series_id().to_string());
        if !forward {
            log::debug!("🔇 Suppressed {} on {} (window '{}')", event_type, resource.series_id(), tracker.name());
        }
        forward
    }

    async fn route_tag_relation(&self, op: TagOp, relation: &ResourceDescriptor, actor_id: &str) {
        let Some(source_id) = relation.relation_source.as_deref() else {
            log::warn!("⚠️  Tagging relation {} has no source document, ignoring", relation.id);
            return;
        };

        let Some(document) = self.dispatcher.lookup_resource(source_id).await else {
            return;
        };

        let tag = relation.title.as_deref().or(relation.name.as_deref());
        match (op, tag) {
            (TagOp::Add, Some(tag)) => self.record_tag_operation(document.series_id(), actor_id, tag, true).await,
            (TagOp::Remove, Some(tag)) => self.record_tag_operation(document.series_id(), actor_id, tag, false).await,
            _ => {
                self.tags.touch(document.series_id(), actor_id);
                self.drain_tags_after_shutdown().await;
            }
        }
    }

    /// Entry point for tag-specific aggregation
    pub async fn record_tag_operation(&self, resource_id: &str, actor_id: &str, tag: &str, is_add: bool) {
        if !self.config.enabled || self.is_shut_down() {
            let mut edits = TagEdits::default();
            if is_add {
                edits.add(tag);
            } else {
                edits.remove(tag);
            }
            let flush = TagFlush {
                key: AggregationKey::new(actor_id, resource_id),
                edits,
            };
            TagBatcher::deliver(vec![flush], &self.dispatcher).await;
            return;
        }

        self.tags.record_tag_op(resource_id, actor_id, tag, is_add);
        self.drain_tags_after_shutdown().await;
    }

    async fn drain_tags_after_shutdown(&self) {
        if self.is_shut_down() {
            self.tags.drain_all(&self.dispatcher).await;
        }
    }

    /// Run one sweep pass now: flush expired buckets and tag keys, then
    /// sweep the generic windows. Returns the number of notifications sent.
    pub async fn flush_now(&self) -> usize {
        let _gate = self.sweep_gate.lock().await;
        if self.is_shut_down() {
            return 0;
        }

        let merged = self.merging.flush_expired(&self.dispatcher).await;
        let tagged = self.tags.flush_expired(&self.dispatcher).await;
        let swept = self.registry.sweep();

        if merged + tagged > 0 || swept > 0 {
            log::debug!(
                "Sweep pass: {} merged, {} tag notifications, {} windows expired",
                merged,
                tagged,
                swept
            );
        }

        merged + tagged
    }

    /// Stop the sweep and send everything still buffered
    ///
    /// Only the first call does any work; later calls return 0.
    pub async fn shutdown(&self) -> usize {
        let handle = {
            let mut sweep_task = lock(&self.sweep_task);
            if self.shut_down.swap(true, Ordering::SeqCst) {
                return 0;
            }
            sweep_task.take()
        };

        log::info!("🛑 Shutting down activity aggregation...");
        if let Some(handle) = handle {
            handle.stop().await;
        }

        let _gate = self.sweep_gate.lock().await;
        let merged = self.merging.drain_all(&self.dispatcher).await;
        let tagged = self.tags.drain_all(&self.dispatcher).await;
        self.updates.lock().drain();
        self.publications.lock().drain();

        log::info!("✅ Aggregation drained: {} merged, {} tag notifications", merged, tagged);
        merged + tagged
    }
}
