use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::orchestrator::BatchCounts;

#[derive(Default)]
pub struct PipelineMetrics {
    // Counters
    batches: AtomicUsize,
    articles_received: AtomicUsize,
    articles_stored: AtomicUsize,
    articles_merged: AtomicUsize,
    articles_skipped: AtomicUsize,
    articles_failed: AtomicUsize,
    articles_cancelled: AtomicUsize,
    queries: AtomicUsize,
    failed_queries: AtomicUsize,

    // Timing (in microseconds)
    total_ingest_time_us: AtomicU64,
    total_dedup_time_us: AtomicU64,
    total_extract_time_us: AtomicU64,
    total_store_time_us: AtomicU64,
    total_query_time_us: AtomicU64,

    extractions: AtomicUsize,
    entities_extracted: AtomicUsize,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&self, counts: &BatchCounts) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.articles_received.fetch_add(counts.received, Ordering::Relaxed);
        self.articles_stored.fetch_add(counts.stored, Ordering::Relaxed);
        self.articles_merged.fetch_add(counts.deduplicated_away, Ordering::Relaxed);
        self.articles_skipped.fetch_add(counts.skipped, Ordering::Relaxed);
        self.articles_failed.fetch_add(counts.failed, Ordering::Relaxed);
        self.articles_cancelled.fetch_add(counts.cancelled, Ordering::Relaxed);
    }

    pub fn record_ingest(&self, duration: Duration) {
        self.total_ingest_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_dedup(&self, duration: Duration) {
        self.total_dedup_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_extract(&self, duration: Duration, entities: usize) {
        self.total_extract_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.extractions.fetch_add(1, Ordering::Relaxed);
        self.entities_extracted.fetch_add(entities, Ordering::Relaxed);
    }

    pub fn record_store(&self, duration: Duration) {
        self.total_store_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_query(&self, duration: Duration, success: bool) {
        self.total_query_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.queries.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_queries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let received = self.articles_received.load(Ordering::Relaxed);
        let stored = self.articles_stored.load(Ordering::Relaxed);

        MetricsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            articles_received: received,
            articles_stored: stored,
            articles_merged: self.articles_merged.load(Ordering::Relaxed),
            articles_skipped: self.articles_skipped.load(Ordering::Relaxed),
            articles_failed: self.articles_failed.load(Ordering::Relaxed),
            articles_cancelled: self.articles_cancelled.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            avg_ingest_time_ms: avg_time_ms(&self.total_ingest_time_us, received),
            avg_dedup_time_ms: avg_time_ms(&self.total_dedup_time_us, self.batches.load(Ordering::Relaxed)),
            avg_extract_time_ms: avg_time_ms(&self.total_extract_time_us, self.extractions.load(Ordering::Relaxed)),
            avg_store_time_ms: avg_time_ms(&self.total_store_time_us, stored),
            avg_query_time_ms: avg_time_ms(&self.total_query_time_us, self.queries.load(Ordering::Relaxed)),
            entities_extracted: self.entities_extracted.load(Ordering::Relaxed),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: usize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    if count > 0 {
        total / count as f64 / 1000.0 // Convert to ms
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub batches: usize,
    pub articles_received: usize,
    pub articles_stored: usize,
    pub articles_merged: usize,
    pub articles_skipped: usize,
    pub articles_failed: usize,
    pub articles_cancelled: usize,
    pub queries: usize,
    pub failed_queries: usize,
    pub avg_ingest_time_ms: f64,
    pub avg_dedup_time_ms: f64,
    pub avg_extract_time_ms: f64,
    pub avg_store_time_ms: f64,
    pub avg_query_time_ms: f64,
    pub entities_extracted: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
