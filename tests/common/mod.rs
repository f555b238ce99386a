//! Shared fixtures for the integration tests

#![allow(dead_code)]

use activityflow::activity::{Activity, ActivityObject, OBJECT_TYPE_COLLECTION};
use activityflow::aggregation::{AggregationConfig, AggregationCoordinator, Clock, ManualClock, ResourceDescriptor};
use activityflow::directory::InMemoryDirectory;
use activityflow::dispatch::Dispatcher;
use activityflow::transport::{MemoryTransport, NotificationTransport};
use activityflow::AggregationError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub clock: ManualClock,
    pub transport: Arc<MemoryTransport>,
    pub directory: Arc<InMemoryDirectory>,
    pub coordinator: Arc<AggregationCoordinator>,
}

/// Enabled coordinator on a manual clock, nothing spawned
pub fn harness(window: Duration) -> Harness {
    let clock = ManualClock::new(1_000_000);
    build(AggregationConfig::enabled_with_window(window), clock.clock(), clock)
}

/// Enabled coordinator on the real clock, for tests that run the sweep task
pub fn realtime_harness(window: Duration) -> Harness {
    build(AggregationConfig::enabled_with_window(window), Clock::monotonic(), ManualClock::new(0))
}

/// Enabled coordinator on a manual clock whose sends all go to `sink`
///
/// The returned harness' own `transport` stays empty.
pub fn harness_with_transport(window: Duration, sink: Arc<dyn NotificationTransport>) -> Harness {
    let clock = ManualClock::new(1_000_000);
    build_with(AggregationConfig::enabled_with_window(window), clock.clock(), clock, sink, Arc::new(MemoryTransport::new()))
}

fn build(config: AggregationConfig, clock: Clock, manual: ManualClock) -> Harness {
    let transport = Arc::new(MemoryTransport::new());
    build_with(config, clock, manual, transport.clone(), transport)
}

fn build_with(
    config: AggregationConfig,
    clock: Clock,
    manual: ManualClock,
    sink: Arc<dyn NotificationTransport>,
    transport: Arc<MemoryTransport>,
) -> Harness {
    let directory = Arc::new(InMemoryDirectory::new());
    let dispatcher = Dispatcher::new(sink, directory.clone(), directory.clone()).with_base_url("http://host/nuxeo/");

    Harness {
        clock: manual,
        transport,
        directory,
        coordinator: Arc::new(AggregationCoordinator::new(config, Arc::new(dispatcher), clock)),
    }
}

/// Transport whose every send fails, counting the attempts
#[derive(Default)]
pub struct FailingTransport {
    attempts: AtomicUsize,
}

impl FailingTransport {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationTransport for FailingTransport {
    async fn send(&self, _activity: &Activity, user: &str) -> activityflow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AggregationError::Transport(format!("stream for {} unavailable", user)))
    }

    fn transport_type(&self) -> &'static str {
        "failing"
    }
}

/// Translated activity about document `id` inside `folder`
pub fn document_activity(verb: &str, id: &str, folder: &str) -> Activity {
    Activity::new(verb).with_object(ActivityObject {
        id: Some(id.to_string()),
        display_name: Some(id.to_string()),
        object_type: Some("Document".to_string()),
        url: Some(format!("http://host/nuxeo/nxpath/default{}/{}/@view_documents", folder, id)),
        content: None,
    })
}

pub fn document(id: &str) -> ResourceDescriptor {
    ResourceDescriptor {
        id: id.to_string(),
        doc_type: "File".to_string(),
        title: Some(format!("Title of {}", id)),
        path: Some(format!("/ws/{}", id)),
        ..Default::default()
    }
}

pub fn tag_relation(id: &str, source: &str, tag: &str) -> ResourceDescriptor {
    ResourceDescriptor {
        id: id.to_string(),
        doc_type: "Tagging".to_string(),
        title: Some(tag.to_string()),
        relation_source: Some(source.to_string()),
        ..Default::default()
    }
}

/// Document ids an activity stands for: the collection members or the lone object
pub fn referenced_ids(activity: &Activity) -> Vec<String> {
    match &activity.object {
        Some(object) if object.object_type.as_deref() == Some(OBJECT_TYPE_COLLECTION) => object
            .content
            .as_deref()
            .unwrap_or("")
            .split(',')
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect(),
        Some(object) => object.id.iter().cloned().collect(),
        None => Vec::new(),
    }
}

/// Number of documents an activity stands for
pub fn document_count(activity: &Activity) -> usize {
    referenced_ids(activity).len()
}
