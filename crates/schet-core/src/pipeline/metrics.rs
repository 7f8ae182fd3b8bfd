//! Request counters for the extraction pipeline.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Default)]
struct Counters {
    total: u64,
    successful: u64,
    failed: u64,
    cache_hits: u64,
    cache_misses: u64,
    total_time: Duration,
}

/// Thread-safe pipeline counters.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    counters: Mutex<Counters>,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate_percent: f64,
    pub total_processing_ms: u64,
    pub average_processing_ms: f64,
    pub timestamp: DateTime<Utc>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache(&self, hit: bool) {
        self.update(|c| {
            if hit {
                c.cache_hits += 1;
            } else {
                c.cache_misses += 1;
            }
        });
    }

    pub fn record_request(&self, success: bool, elapsed: Duration) {
        self.update(|c| {
            c.total += 1;
            if success {
                c.successful += 1;
            } else {
                c.failed += 1;
            }
            c.total_time += elapsed;
        });
    }

    pub fn reset(&self) {
        self.update(|c| *c = Counters::default());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = match self.counters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let lookups = c.cache_hits + c.cache_misses;
        let total_ms = c.total_time.as_millis() as u64;
        MetricsSnapshot {
            total_requests: c.total,
            successful_requests: c.successful,
            failed_requests: c.failed,
            cache_hits: c.cache_hits,
            cache_misses: c.cache_misses,
            cache_hit_rate_percent: if lookups == 0 {
                0.0
            } else {
                c.cache_hits as f64 * 100.0 / lookups as f64
            },
            total_processing_ms: total_ms,
            average_processing_ms: if c.total == 0 {
                0.0
            } else {
                total_ms as f64 / c.total as f64
            },
            timestamp: Utc::now(),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Counters)) {
        let mut guard = match self.counters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counts_and_rates() {
        let metrics = PipelineMetrics::new();
        metrics.record_cache(false);
        metrics.record_request(true, Duration::from_millis(30));
        metrics.record_cache(true);
        metrics.record_request(true, Duration::from_millis(10));
        metrics.record_cache(false);
        metrics.record_request(false, Duration::from_millis(20));
        metrics.record_cache(true);

        let s = metrics.snapshot();
        assert_eq!(s.total_requests, 3);
        assert_eq!(s.successful_requests, 2);
        assert_eq!(s.failed_requests, 1);
        assert_eq!(s.cache_hit_rate_percent, 50.0);
        assert_eq!(s.total_processing_ms, 60);
        assert_eq!(s.average_processing_ms, 20.0);
    }

    #[test]
    fn test_reset() {
        let metrics = PipelineMetrics::new();
        metrics.record_cache(true);
        metrics.record_request(true, Duration::from_millis(5));
        metrics.reset();

        let s = metrics.snapshot();
        assert_eq!(s.total_requests, 0);
        assert_eq!(s.cache_hit_rate_percent, 0.0);
        assert_eq!(s.average_processing_ms, 0.0);
    }
}
