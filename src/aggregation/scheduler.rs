//! Background sweep task
//!
//! One task per coordinator ticks at the configured interval and runs a
//! flush pass (merged buckets, tag edits, generic windows). The task holds a
//! weak reference so it never keeps a dropped coordinator alive, and stops
//! on an explicit signal so shutdown can join it before the final drain.

use super::coordinator::AggregationCoordinator;
use std::sync::Weak;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

/// Stop signal and join handle of a running sweep task
pub struct SweepHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Signal the task and wait until it has exited
    ///
    /// A pass already in progress completes first.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);

        if let Err(e) = self.task.await {
            log::error!("❌ Sweep task ended abnormally: {}", e);
        }
    }
}

/// Spawn the periodic sweep for `coordinator`
///
/// The first pass runs one full interval after spawning.
pub fn spawn_sweep(coordinator: Weak<AggregationCoordinator>, sweep_interval: Duration) -> SweepHandle {
    let (stop_tx, stop_rx) = watch::channel(false);
    let task = tokio::spawn(sweep_task(coordinator, sweep_interval, stop_rx));

    SweepHandle { stop_tx, task }
}

async fn sweep_task(
    coordinator: Weak<AggregationCoordinator>,
    sweep_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    log::info!("⏰ Starting aggregation sweep (interval: {}ms)", sweep_interval.as_millis());

    let mut timer = interval_at(Instant::now() + sweep_interval, sweep_interval);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = timer.tick() => {}
            changed = stop_rx.changed() => {
                // sender dropped counts as a stop request
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        let Some(coordinator) = coordinator.upgrade() else {
            log::debug!("Coordinator dropped, sweep task exiting");
            break;
        };

        let sent = coordinator.flush_now().await;
        if sent > 0 {
            log::debug!("⏰ Sweep flushed {} notifications", sent);
        }
    }

    log::info!("⏹️  Aggregation sweep stopped");
}
