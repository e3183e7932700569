use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::guard::{Guard, SweepStats};
use crate::telemetry::Metrics;

/// Run one expiry pass over every store held by the guard.
pub fn sweep_once(guard: &Guard, metrics: Option<&Metrics>, now: SystemTime) -> SweepStats {
    let stats = guard.sweep_expired(now);
    let tracked = guard.tracked_keys();

    if let Some(m) = metrics {
        m.record_sweep(stats.windows, stats.bursts, tracked);
    }
    if stats.total() > 0 {
        debug!(windows = stats.windows, bursts = stats.bursts, tracked, "Expired windows swept");
    }
    stats
}

/// Sweep expired windows every `interval` until `shutdown` is cancelled.
///
/// The first pass runs one full interval after spawning.
pub fn spawn_sweeper(
    guard: Arc<Guard>,
    interval: Duration,
    shutdown: CancellationToken,
    metrics: Option<Arc<Metrics>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now()
            .checked_add(interval)
            .unwrap_or_else(tokio::time::Instant::now);
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Window sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    sweep_once(&guard, metrics.as_deref(), SystemTime::now());
                }
            }
        }
    })
}
