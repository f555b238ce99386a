//! Activity Relay - change events in, aggregated ActivityStreams out
//!
//! Reads one JSON change event per line from stdin, runs it through the
//! aggregation engine and posts the resulting activities to the feed
//! service. Stops on CTRL+C or end of input, draining every open batch.
//!
//! Usage:
//!   cat events.jsonl | cargo run --release --bin activity_relay
//!
//! Environment variables:
//!   SHINDIG_URL - Feed service root (required)
//!   NUXEO_URL - Repository root for document URLs (default: http://localhost:8080/nuxeo/)
//!   ACTIVITIES_AGGREGATE - Master switch for aggregation (default: false)
//!   ACTIVITIES_AGGREGATE_INTERVAL_MS - Merge/suppression window (default: 10000)
//!   ACTIVITIES_TAGS_AGGREGATE_INTERVAL_MS - Tag window (default: 30000)
//!   ACTIVITY_LOG_PATH - JSONL log of delivered activities (optional)

use activityflow::activity_log::ActivityLog;
use activityflow::aggregation::{AggregationConfig, AggregationCoordinator, Clock};
use activityflow::config::RelayConfig;
use activityflow::directory::InMemoryDirectory;
use activityflow::dispatch::Dispatcher;
use activityflow::ingestion::{start_ingestion, ChangeEvent};
use activityflow::transport::HttpTransport;
use dotenv::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize environment and logging
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 Activity Relay");

    let relay_config = RelayConfig::from_env()?;
    let aggregation_config = AggregationConfig::from_env();

    info!("   ├─ Feed service: {}", relay_config.shindig_url);
    info!("   ├─ Repository: {}", relay_config.nuxeo_url);
    info!("   ├─ Aggregation: {}", if aggregation_config.enabled { "ENABLED" } else { "disabled" });
    info!("   └─ Channel buffer: {} events", relay_config.channel_buffer);

    let transport = HttpTransport::new(relay_config.shindig_url.clone(), relay_config.transport_timeout())?;
    let directory = Arc::new(InMemoryDirectory::new());

    let mut dispatcher = Dispatcher::new(Arc::new(transport), directory.clone(), directory.clone())
        .with_generator(relay_config.generator())
        .with_base_url(relay_config.nuxeo_url.clone());
    if let Some(path) = &relay_config.activity_log_path {
        dispatcher = dispatcher.with_activity_log(ActivityLog::open(path)?);
    }

    let coordinator = Arc::new(AggregationCoordinator::new(
        aggregation_config,
        Arc::new(dispatcher),
        Clock::monotonic(),
    ));
    coordinator.start();

    let (tx, rx) = mpsc::channel::<ChangeEvent>(relay_config.channel_buffer);
    let ingestion = tokio::spawn(start_ingestion(rx, coordinator.clone()));
    let mut reader = tokio::spawn(read_events(tx, directory));

    info!("🔄 Reading events from stdin, press CTRL+C to shutdown gracefully");

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("⚠️  Received CTRL+C, shutting down..."),
                Err(err) => error!("❌ Failed to listen for CTRL+C: {}", err),
            }
            // dropping the reader closes the channel
            reader.abort();
        }
        read = &mut reader => {
            match read {
                Ok(lines) => info!("📭 End of input after {} lines, shutting down...", lines),
                Err(e) => error!("❌ Event reader failed: {}", e),
            }
        }
    }

    match ingestion.await {
        Ok(stats) => info!("   ├─ Ingested {} events ({} absorbed)", stats.received, stats.absorbed),
        Err(e) => warn!("⚠️  Ingestion task ended abnormally: {}", e),
    }

    let flushed = coordinator.shutdown().await;
    info!("   └─ Flushed {} pending activities", flushed);
    info!("✅ Activity Relay stopped");

    Ok(())
}

/// Forward stdin lines to the ingestion channel; returns the lines read
///
/// Every resource seen is remembered so later lookups (tag relation
/// sources, documents of tag activities) can resolve it.
async fn read_events(tx: mpsc::Sender<ChangeEvent>, directory: Arc<InMemoryDirectory>) -> u64 {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut count = 0u64;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("❌ Failed to read stdin: {}", e);
                break;
            }
        };
        count += 1;

        if line.trim().is_empty() {
            continue;
        }

        let event: ChangeEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!("⚠️  Skipping malformed event on line {}: {}", count, e);
                continue;
            }
        };

        directory.insert_resource(event.resource.clone());

        if tx.send(event).await.is_err() {
            warn!("⚠️  Ingestion channel closed, stopping reader");
            break;
        }
    }

    count
}
