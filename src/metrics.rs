// ═══════════════════════════════════════════════════════════════
// METRICS COLLECTOR - Because if you can't measure it, it didn't happen
// ═══════════════════════════════════════════════════════════════
//
// Atomic counters for everything the HTTP service does. Lock-free, because
// every connection task bumps them and none of them should wait on the
// others to do it. Served as JSON on GET /metrics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::models::{AnalysisResult, RiskTier, TierDistribution};

/// The metrics snapshot - what gets serialized to JSON
#[derive(Debug, Serialize, Clone)]
pub struct MetricsSnapshot {
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub total_analyses: u64,
    pub tiers: TierDistribution,
    pub keywords_matched: u64,
    pub rejected_inputs: u64,
    pub reports_rendered: u64,
    pub batches_processed: u64,
    pub batch_rows_processed: u64,
    pub http_requests: u64,
    pub http_errors: u64,
    pub analyses_per_minute: f64,
    pub status: String,
}

/// Thread-safe atomic metrics collector
pub struct MetricsCollector {
    high: AtomicU64,
    mid: AtomicU64,
    low: AtomicU64,
    safe: AtomicU64,
    keywords_matched: AtomicU64,
    rejected_inputs: AtomicU64,
    reports_rendered: AtomicU64,
    batches_processed: AtomicU64,
    batch_rows_processed: AtomicU64,
    http_requests: AtomicU64,
    http_errors: AtomicU64,
    started_at: DateTime<Utc>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            high: AtomicU64::new(0),
            mid: AtomicU64::new(0),
            low: AtomicU64::new(0),
            safe: AtomicU64::new(0),
            keywords_matched: AtomicU64::new(0),
            rejected_inputs: AtomicU64::new(0),
            reports_rendered: AtomicU64::new(0),
            batches_processed: AtomicU64::new(0),
            batch_rows_processed: AtomicU64::new(0),
            http_requests: AtomicU64::new(0),
            http_errors: AtomicU64::new(0),
            started_at: Utc::now(),
            start_time: Instant::now(),
        }
    }

    pub fn record_analysis(&self, result: &AnalysisResult) {
        self.record_tier(result.tier, result.keyword_count);
    }

    pub fn record_tier(&self, tier: RiskTier, keyword_count: usize) {
        let counter = match tier {
            RiskTier::High => &self.high,
            RiskTier::Mid => &self.mid,
            RiskTier::Low => &self.low,
            RiskTier::Safe => &self.safe,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.keywords_matched
            .fetch_add(keyword_count as u64, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.rejected_inputs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reports(&self) {
        self.reports_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch(&self, rows: usize) {
        self.batches_processed.fetch_add(1, Ordering::Relaxed);
        self.batch_rows_processed
            .fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn increment_requests(&self) {
        self.http_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_errors(&self) {
        self.http_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all metrics (lock-free reads)
    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self.start_time.elapsed().as_secs();
        let tiers = TierDistribution {
            high: self.high.load(Ordering::Relaxed) as usize,
            mid: self.mid.load(Ordering::Relaxed) as usize,
            low: self.low.load(Ordering::Relaxed) as usize,
            safe: self.safe.load(Ordering::Relaxed) as usize,
        };
        let total_analyses = tiers.total() as u64;
        let analyses_per_minute = if uptime > 0 {
            (total_analyses as f64 / uptime as f64) * 60.0
        } else {
            0.0
        };

        MetricsSnapshot {
            started_at: self.started_at,
            uptime_seconds: uptime,
            total_analyses,
            tiers,
            keywords_matched: self.keywords_matched.load(Ordering::Relaxed),
            rejected_inputs: self.rejected_inputs.load(Ordering::Relaxed),
            reports_rendered: self.reports_rendered.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            batch_rows_processed: self.batch_rows_processed.load(Ordering::Relaxed),
            http_requests: self.http_requests.load(Ordering::Relaxed),
            http_errors: self.http_errors.load(Ordering::Relaxed),
            analyses_per_minute,
            status: "operational".to_string(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
