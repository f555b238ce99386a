//! Tag edit aggregation per (resource, actor)
//!
//! Tag adds and removes on one document by one actor accumulate into a net
//! set of additions and removals. Adding a tag that is pending removal (or
//! the reverse) cancels both. When the window elapses at most two activities
//! are sent (removals, then additions); a burst that netted out to nothing
//! still produces one generic "tag" activity.

use super::clock::Clock;
use super::lock;
use super::types::AggregationKey;
use super::window::WindowTracker;
use crate::activity::{Activity, ActivityObject};
use crate::dispatch::Dispatcher;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Net tag changes of one key; a tag is never in both lists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagEdits {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl TagEdits {
    pub fn add(&mut self, tag: &str) {
        if let Some(pos) = self.removed.iter().position(|t| t == tag) {
            self.removed.remove(pos);
        } else if !self.added.iter().any(|t| t == tag) {
            self.added.push(tag.to_string());
        }
    }

    pub fn remove(&mut self, tag: &str) {
        if let Some(pos) = self.added.iter().position(|t| t == tag) {
            self.added.remove(pos);
        } else if !self.removed.iter().any(|t| t == tag) {
            self.removed.push(tag.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Tag state of one key removed from the batcher
#[derive(Debug, Clone, PartialEq)]
pub struct TagFlush {
    pub key: AggregationKey,
    pub edits: TagEdits,
}

impl TagFlush {
    pub fn resource_id(&self) -> &str {
        &self.key.scope
    }

    /// Activities for this key: removals and additions, or a generic "tag"
    pub fn into_activities(
        self,
        actor: ActivityObject,
        document: ActivityObject,
        generator: Option<ActivityObject>,
    ) -> Vec<Activity> {
        if self.edits.is_empty() {
            return vec![Activity::new("tag")
                .with_actor(actor)
                .with_object(document)
                .with_generator(generator)];
        }

        let mut activities = Vec::with_capacity(2);
        let TagEdits { added, removed } = self.edits;

        for (verb, tags) in [("remove", removed), ("add", added)] {
            if tags.is_empty() {
                continue;
            }
            activities.push(
                Activity::new(verb)
                    .with_actor(actor.clone())
                    .with_object(ActivityObject::tag_list(&tags))
                    .with_target(document.clone())
                    .with_generator(generator.clone()),
            );
        }

        activities
    }
}

pub struct TagBatcher {
    windows: WindowTracker<AggregationKey>,
    edits: Mutex<HashMap<AggregationKey, TagEdits>>,
}

impl TagBatcher {
    pub fn new(window: Duration, clock: Clock) -> Self {
        Self {
            windows: WindowTracker::new("tags", window, clock),
            edits: Mutex::new(HashMap::new()),
        }
    }

    /// Record one tag add or remove, cancelling its opposite if pending
    ///
    /// The window is refreshed even when the edit nets out to nothing.
    pub fn record_tag_op(&self, resource_id: &str, actor_id: &str, tag: &str, is_add: bool) {
        let key = AggregationKey::new(actor_id, resource_id);

        let mut windows = self.windows.lock();
        let mut edits = lock(&self.edits);

        let entry = edits.entry(key.clone()).or_default();
        if is_add {
            entry.add(tag);
        } else {
            entry.remove(tag);
        }

        windows.should_send_or_start_window(&key);
    }

    /// Tag change without per-tag detail: only the timer moves
    pub fn touch(&self, resource_id: &str, actor_id: &str) {
        let key = AggregationKey::new(actor_id, resource_id);
        self.windows.lock().should_send_or_start_window(&key);
    }

    pub fn pending_edits(&self, resource_id: &str, actor_id: &str) -> Option<TagEdits> {
        lock(&self.edits)
            .get(&AggregationKey::new(actor_id, resource_id))
            .cloned()
    }

    /// Keys with a live window
    pub fn pending_keys(&self) -> usize {
        self.windows.len()
    }

    fn take(&self, all: bool) -> Vec<TagFlush> {
        let mut windows = self.windows.lock();
        let mut edits = lock(&self.edits);

        let keys = if all { windows.drain() } else { windows.take_expired() };
        let mut flushes: Vec<TagFlush> = keys
            .into_iter()
            .map(|key| {
                let edits = edits.remove(&key).unwrap_or_default();
                TagFlush { key, edits }
            })
            .collect();

        if all {
            flushes.extend(edits.drain().map(|(key, edits)| {
                log::warn!("⚠️  Tag edits for {} had no window, flushing anyway", key);
                TagFlush { key, edits }
            }));
        }

        flushes
    }

    pub fn take_expired(&self) -> Vec<TagFlush> {
        self.take(false)
    }

    pub fn take_all(&self) -> Vec<TagFlush> {
        self.take(true)
    }

    /// Send activities for expired keys; returns the number sent
    pub async fn flush_expired(&self, dispatcher: &Dispatcher) -> usize {
        let flushes = self.take_expired();
        Self::deliver(flushes, dispatcher).await
    }

    /// Send activities for every key (shutdown); returns the number sent
    pub async fn drain_all(&self, dispatcher: &Dispatcher) -> usize {
        let flushes = self.take_all();
        Self::deliver(flushes, dispatcher).await
    }

    /// Resolve the document of each flush and send its activities
    pub(crate) async fn deliver(flushes: Vec<TagFlush>, dispatcher: &Dispatcher) -> usize {
        let mut sent = 0;

        for flush in flushes {
            log::debug!(
                "⏰ Tag window closed for {} (+{} / -{})",
                flush.key,
                flush.edits.added.len(),
                flush.edits.removed.len()
            );

            let Some(document) = dispatcher.document_object(flush.resource_id()).await else {
                log::warn!("⚠️  Dropping tag activities for {}: document unavailable", flush.key);
                continue;
            };

            let user = flush.key.actor.clone();
            let actor = dispatcher.actor_for(&user).await;

            for activity in flush.into_activities(actor, document, dispatcher.generator().cloned()) {
                dispatcher.deliver(&activity, &user).await;
                sent += 1;
            }
        }

        sent
    }
}

#[cfg(test)]
mod tests {
    use super::super::clock::ManualClock;
    use super::super::types::ResourceDescriptor;
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::transport::MemoryTransport;
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_millis(5_000);

    fn setup() -> (ManualClock, TagBatcher, Arc<MemoryTransport>, Arc<InMemoryDirectory>, Dispatcher) {
        let clock = ManualClock::new(0);
        let batcher = TagBatcher::new(WINDOW, clock.clock());
        let transport = Arc::new(MemoryTransport::new());
        let directory = Arc::new(InMemoryDirectory::new());
        directory.insert_resource(ResourceDescriptor {
            id: "doc-1".to_string(),
            doc_type: "File".to_string(),
            title: Some("Budget".to_string()),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(transport.clone(), directory.clone(), directory.clone());
        (clock, batcher, transport, directory, dispatcher)
    }

    #[test]
    fn test_edits_cancel_and_deduplicate() {
        let mut edits = TagEdits::default();

        edits.add("finance");
        edits.add("finance");
        assert_eq!(edits.added, vec!["finance"]);

        edits.remove("finance");
        assert!(edits.is_empty());

        edits.remove("q3");
        edits.add("q3");
        assert!(edits.is_empty());

        edits.remove("draft");
        edits.add("final");
        assert_eq!(edits.added, vec!["final"]);
        assert_eq!(edits.removed, vec!["draft"]);
    }

    #[tokio::test]
    async fn test_add_then_remove_emits_only_fallback() {
        let (clock, batcher, transport, _, dispatcher) = setup();

        batcher.record_tag_op("doc-1", "jdoe", "finance", true);
        batcher.record_tag_op("doc-1", "jdoe", "finance", false);
        assert_eq!(batcher.pending_edits("doc-1", "jdoe"), Some(TagEdits::default()));

        clock.advance(WINDOW);
        assert_eq!(batcher.flush_expired(&dispatcher).await, 1);

        let sent = transport.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.verb, "tag");
        assert_eq!(sent[0].0.object.as_ref().unwrap().display_name.as_deref(), Some("Budget"));
    }

    #[tokio::test]
    async fn test_net_adds_and_removes_emit_two_activities() {
        let (clock, batcher, transport, _, dispatcher) = setup();

        batcher.record_tag_op("doc-1", "jdoe", "finance", true);
        batcher.record_tag_op("doc-1", "jdoe", "q3", true);
        batcher.record_tag_op("doc-1", "jdoe", "draft", false);

        clock.advance(WINDOW);
        assert_eq!(batcher.flush_expired(&dispatcher).await, 2);

        let sent = transport.take();
        assert_eq!(sent[0].0.verb, "remove");
        assert_eq!(
            sent[0].0.object.as_ref().unwrap().display_name.as_deref(),
            Some("Tag \"draft\"")
        );
        assert_eq!(sent[1].0.verb, "add");
        assert_eq!(
            sent[1].0.object.as_ref().unwrap().display_name.as_deref(),
            Some("Tags (finance, q3)")
        );
        assert_eq!(sent[1].0.target.as_ref().unwrap().id.as_deref(), Some("doc-1"));
    }

    #[tokio::test]
    async fn test_touch_only_emits_generic_activity() {
        let (clock, batcher, transport, _, dispatcher) = setup();

        batcher.touch("doc-1", "jdoe");
        assert_eq!(batcher.pending_keys(), 1);
        assert!(batcher.pending_edits("doc-1", "jdoe").is_none());

        clock.advance(WINDOW - Duration::from_millis(1));
        assert_eq!(batcher.flush_expired(&dispatcher).await, 0);
        clock.advance(Duration::from_millis(1));
        assert_eq!(batcher.flush_expired(&dispatcher).await, 1);
        assert_eq!(transport.take()[0].0.verb, "tag");
    }

    #[tokio::test]
    async fn test_missing_document_drops_activities() {
        let (clock, batcher, transport, directory, dispatcher) = setup();

        batcher.record_tag_op("doc-1", "jdoe", "finance", true);
        directory.remove_resource("doc-1");
        clock.advance(WINDOW);

        assert_eq!(batcher.flush_expired(&dispatcher).await, 0);
        assert!(transport.is_empty());
        assert_eq!(batcher.pending_keys(), 0);
    }

    #[tokio::test]
    async fn test_keys_are_per_actor() {
        let (_, batcher, transport, _, dispatcher) = setup();

        batcher.record_tag_op("doc-1", "jdoe", "finance", true);
        batcher.record_tag_op("doc-1", "bob", "finance", false);

        assert_eq!(batcher.drain_all(&dispatcher).await, 2);
        let mut users: Vec<String> = transport.take().into_iter().map(|(_, user)| user).collect();
        users.sort();
        assert_eq!(users, vec!["bob", "jdoe"]);
        assert_eq!(batcher.drain_all(&dispatcher).await, 0);
    }
}
