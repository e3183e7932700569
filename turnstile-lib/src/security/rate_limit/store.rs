//! The store module holds the fixed-window counters behind the rate limiter.
//!
//! Records live in a [`DashMap`]. A key always hashes to the same shard, and
//! [`WindowStore::admit`] holds that shard's write lock through the whole
//! read → check → increment sequence, so concurrent requests for one key are
//! serialized while unrelated keys proceed in parallel on other shards.

use ahash::RandomState;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Counter and reset time for one key in its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRecord {
    /// Requests counted in the current window
    pub count: u32,
    /// Instant the current window closes
    pub reset_at: SystemTime,
}

impl WindowRecord {
    /// First request of a new window.
    pub fn fresh(now: SystemTime, window: Duration) -> Self {
        Self { count: 1, reset_at: now.checked_add(window).unwrap_or(now) }
    }

    /// A window is over once `now` reaches `reset_at`.
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.reset_at
    }
}

/// Outcome of [`WindowStore::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request was counted; `count` is the new total for the window.
    Admitted { count: u32, reset_at: SystemTime },
    /// The window is full; nothing was counted.
    Rejected { count: u32, reset_at: SystemTime },
}

/// Concurrency-safe map from key to [`WindowRecord`].
///
/// # Memory
///
/// Expired records are removed by [`WindowStore::sweep_expired`], normally
/// driven by the background sweeper. Between sweeps, inserting a new key that
/// takes the store past its sweep threshold triggers one inline sweep. The
/// threshold starts at `max_keys` and is reset to twice the surviving record
/// count after every inline sweep, so a store full of live keys is rescanned
/// only after it has doubled again. Requests for existing keys never sweep.
pub struct WindowStore<K> {
    map: DashMap<K, WindowRecord, RandomState>,
    max_keys: usize,
    records: AtomicUsize,
    sweep_threshold: AtomicUsize,
    sweeping: AtomicBool,
    inline_sweeps: AtomicU64,
}

// Default sizing for stores built without configuration
const SHARDS: usize = 64;
const MAX_KEYS: usize = 100_000;

impl<K: Hash + Eq> Default for WindowStore<K> {
    fn default() -> Self {
        Self::new(SHARDS, MAX_KEYS)
    }
}

impl<K: Hash + Eq> WindowStore<K> {
    /// Create a store split over `shards` independently locked maps.
    ///
    /// # Parameters
    /// - `shards`: rounded up to a power of two, at least 2
    /// - `max_keys`: record count that arms the inline sweep, `0` disables it
    pub fn new(shards: usize, max_keys: usize) -> Self {
        let shards = shards.max(2).checked_next_power_of_two().unwrap_or(SHARDS);
        Self {
            map: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), shards),
            max_keys,
            records: AtomicUsize::new(0),
            sweep_threshold: AtomicUsize::new(max_keys),
            sweeping: AtomicBool::new(false),
            inline_sweeps: AtomicU64::new(0),
        }
    }

    /// Return the live record for `key`, starting a new window (count 1) if
    /// there is none or the previous one has expired.
    pub fn get_or_create(&self, key: K, window: Duration, now: SystemTime) -> WindowRecord {
        let (record, inserted) = match self.map.entry(key) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired(now) {
                    entry.insert(WindowRecord::fresh(now, window));
                }
                (*entry.get(), false)
            }
            Entry::Vacant(entry) => (*entry.insert(WindowRecord::fresh(now, window)), true),
        };
        if inserted {
            self.record_inserted(now);
        }
        record
    }

    /// Count one more request in the live window of `key`.
    ///
    /// Returns the updated record, or `None` when the key has no live window.
    pub fn increment(&self, key: &K, now: SystemTime) -> Option<WindowRecord> {
        let mut record = self.map.get_mut(key)?;
        if record.is_expired(now) {
            return None;
        }
        record.count = record.count.saturating_add(1);
        Some(*record)
    }

    /// Get-or-create, check against `limit` and increment as one atomic step.
    ///
    /// - no record or an expired one: a fresh window is started with count 1
    /// - `count >= limit` inside the window: rejected, nothing is counted
    /// - otherwise: the count is incremented
    pub fn admit(&self, key: K, limit: u32, window: Duration, now: SystemTime) -> Admission {
        let (admission, inserted) = match self.map.entry(key) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                let admission = if record.is_expired(now) {
                    *record = WindowRecord::fresh(now, window);
                    Admission::Admitted { count: record.count, reset_at: record.reset_at }
                } else if record.count >= limit {
                    Admission::Rejected { count: record.count, reset_at: record.reset_at }
                } else {
                    record.count = record.count.saturating_add(1);
                    Admission::Admitted { count: record.count, reset_at: record.reset_at }
                };
                (admission, false)
            }
            Entry::Vacant(entry) => {
                let record = *entry.insert(WindowRecord::fresh(now, window));
                (Admission::Admitted { count: record.count, reset_at: record.reset_at }, true)
            }
        };
        // the entry's shard lock is released here; sweeping under it would deadlock
        if inserted {
            self.record_inserted(now);
        }
        admission
    }

    /// Read the live record for `key` without modifying the store.
    pub fn get(&self, key: &K, now: SystemTime) -> Option<WindowRecord> {
        self.map
            .get(key)
            .map(|record| *record)
            .filter(|record| !record.is_expired(now))
    }

    /// Remove every record whose window has ended. Returns the number removed.
    pub fn sweep_expired(&self, now: SystemTime) -> usize {
        let mut removed = 0usize;
        self.map.retain(|_, record| {
            let live = !record.is_expired(now);
            if !live {
                removed = removed.saturating_add(1);
            }
            live
        });
        // saturating: a concurrent insert may not have been counted yet
        let _ = self
            .records
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| Some(n.saturating_sub(removed)));
        removed
    }

    /// Number of records currently held, expired or not.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Record count that arms the inline sweep, `0` when disabled.
    pub fn max_keys(&self) -> usize {
        self.max_keys
    }

    /// Number of inline sweeps run since the store was created.
    pub fn inline_sweeps(&self) -> u64 {
        self.inline_sweeps.load(Ordering::Relaxed)
    }

    fn record_inserted(&self, now: SystemTime) {
        let records = self.records.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        if self.max_keys == 0 || records <= self.sweep_threshold.load(Ordering::Acquire) {
            return;
        }
        // one sweeper at a time; other inserts carry on without waiting
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let removed = self.sweep_expired(now);
        let live = self.records.load(Ordering::Acquire);
        self.sweep_threshold
            .store(self.max_keys.max(live.saturating_mul(2)), Ordering::Release);
        self.inline_sweeps.fetch_add(1, Ordering::Relaxed);
        self.sweeping.store(false, Ordering::Release);

        debug!(removed, live, "Window store over capacity, swept inline");
    }
}
