//! Change event ingestion - async channel consumer feeding the coordinator

use crate::activity::Activity;
use crate::aggregation::{AggregationCoordinator, ResourceDescriptor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// One change event from the event source, optionally already translated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_type: String,
    pub actor: String,
    pub resource: ResourceDescriptor,
    #[serde(default)]
    pub activity: Option<Activity>,
}

/// Totals reported when the channel closes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionStats {
    pub received: u64,
    pub forwarded: u64,
    pub absorbed: u64,
}

/// Consume events until every sender is dropped
///
/// Per event: `evaluate_for_aggregation`, then `submit_notification` for
/// forwarded events that carry a translated activity.
pub async fn start_ingestion(
    mut rx: mpsc::Receiver<ChangeEvent>,
    coordinator: Arc<AggregationCoordinator>,
) -> IngestionStats {
    log::info!("🚀 Starting event ingestion");

    let mut stats = IngestionStats::default();
    let mut window_count = 0u64;
    let mut last_log_time = Instant::now();

    while let Some(event) = rx.recv().await {
        stats.received += 1;
        window_count += 1;

        let forward = coordinator
            .evaluate_for_aggregation(&event.event_type, &event.resource, &event.actor)
            .await;

        if forward {
            stats.forwarded += 1;
            match event.activity {
                Some(activity) => coordinator.submit_notification(activity, &event.actor).await,
                None => log::debug!("Event {} on {} has no activity attached", event.event_type, event.resource.id),
            }
        } else {
            stats.absorbed += 1;
        }

        // Log throughput every 10 seconds
        if last_log_time.elapsed().as_secs() >= 10 {
            let per_sec = window_count as f64 / last_log_time.elapsed().as_secs_f64();
            log::info!(
                "📊 Ingestion rate: {:.1} events/sec (total: {}, absorbed: {})",
                per_sec,
                stats.received,
                stats.absorbed
            );
            last_log_time = Instant::now();
            window_count = 0;
        }
    }

    log::info!(
        "⏹️  Event channel closed ({} received, {} forwarded, {} absorbed)",
        stats.received,
        stats.forwarded,
        stats.absorbed
    );
    stats
}
