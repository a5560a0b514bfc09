use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Read-only view of the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub records_active: u64,
    /// Records ever created, tombstoned and compacted ones included
    pub records_total: u64,
    pub queries_total: u64,
    /// Running mean over every served query
    pub avg_query_latency_ms: f64,
    /// Queries answered from the query cache (also counted in `queries_total`)
    pub cache_hits: u64,
}

#[derive(Debug, Default)]
struct Counters {
    records_active: u64,
    records_total: u64,
    queries_total: u64,
    mean_ms: f64,
    cache_hits: u64,
}

/// Counters updated on every write and query.
///
/// Everything sits behind one lock so a snapshot never pairs a fresh
/// `records_active` with a stale `records_total`.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    counters: Mutex<Counters>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite every counter with a persisted snapshot.
    pub fn restore(&self, snapshot: &MetricsSnapshot) {
        *self.counters.lock() = Counters {
            records_active: snapshot.records_active,
            records_total: snapshot.records_total.max(snapshot.records_active),
            queries_total: snapshot.queries_total,
            mean_ms: snapshot.avg_query_latency_ms,
            cache_hits: snapshot.cache_hits,
        };
    }

    pub fn on_insert(&self) {
        self.on_insert_many(1);
    }

    pub fn on_insert_many(&self, count: u64) {
        let mut counters = self.counters.lock();
        counters.records_total = counters.records_total.saturating_add(count);
        counters.records_active = counters.records_active.saturating_add(count);
    }

    pub fn on_tombstone(&self) {
        let mut counters = self.counters.lock();
        counters.records_active = counters.records_active.saturating_sub(1);
    }

    /// Fold one query latency into the running mean.
    pub fn on_query(&self, latency: Duration) {
        let sample = latency.as_secs_f64() * 1_000.0;
        let mut counters = self.counters.lock();
        counters.queries_total += 1;
        #[allow(clippy::cast_precision_loss)]
        let n = counters.queries_total as f64;
        counters.mean_ms += (sample - counters.mean_ms) / n;
    }

    pub fn on_cache_hit(&self) {
        self.counters.lock().cache_hits += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.counters.lock();
        MetricsSnapshot {
            records_active: counters.records_active,
            records_total: counters.records_total,
            queries_total: counters.queries_total,
            avg_query_latency_ms: counters.mean_ms,
            cache_hits: counters.cache_hits,
        }
    }
}
