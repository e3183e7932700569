use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::telemetry::Metrics;

/// Counts open client connections and signals when the last one closes
#[derive(Clone)]
pub struct ConnectionTracker {
    active: Arc<AtomicUsize>,
    closed_tx: watch::Sender<()>,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        let (closed_tx, _) = watch::channel(());
        Self { active: Arc::new(AtomicUsize::new(0)), closed_tx }
    }
}

impl ConnectionTracker {
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Receiver notified every time the count drops to zero
    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.closed_tx.subscribe()
    }

    pub fn track(&self, metrics: Option<&Arc<Metrics>>) -> ConnectionGuard {
        self.active.fetch_add(1, Ordering::AcqRel);
        if let Some(m) = metrics {
            m.connections_total.add(1, &[]);
            m.connections_active.add(1, &[]);
        }
        ConnectionGuard {
            counter: self.active.clone(),
            notifier: self.closed_tx.clone(),
            connections_active: metrics.map(|m| m.connections_active.clone()),
        }
    }
}

/// Guard to decrement active connections counter when dropped
/// Also notifies when the last connection closes (for graceful shutdown)
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
    connections_active: Option<opentelemetry::metrics::UpDownCounter<i64>>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.counter.fetch_sub(1, Ordering::AcqRel);
        if let Some(ref counter) = self.connections_active {
            counter.add(-1, &[]);
        }
        if remaining == 1 {
            self.notifier.send_replace(());
        }
    }
}
