//! In-process request counters
//!
//! One mutex guards every counter so a snapshot is always consistent.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use indexmap::IndexMap;
use serde::Serialize;

/// Shared request metrics, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct RequestMetrics {
    inner: Arc<Mutex<Counters>>,
}

#[derive(Debug, Default)]
struct Counters {
    requests_total: u64,
    errors_total: u64,
    latency_total: Duration,
    latency_max: Duration,
    routes: IndexMap<String, u64>,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    /// Responses with status 400 or above
    pub errors_total: u64,
    pub average_latency_ms: f64,
    pub max_latency_ms: f64,
    /// Requests per matched route, in first-seen order
    pub routes: IndexMap<String, u64>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished request
    pub fn record(&self, route: &str, status: u16, latency: Duration) {
        let mut counters = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        counters.requests_total += 1;
        if status >= 400 {
            counters.errors_total += 1;
        }

        counters.latency_total += latency;
        counters.latency_max = counters.latency_max.max(latency);

        *counters.routes.entry(route.to_string()).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        #[allow(clippy::cast_precision_loss)]
        let average_latency_ms = if counters.requests_total == 0 {
            0.0
        } else {
            as_millis(counters.latency_total) / counters.requests_total as f64
        };

        MetricsSnapshot {
            requests_total: counters.requests_total,
            errors_total: counters.errors_total,
            average_latency_ms,
            max_latency_ms: as_millis(counters.latency_max),
            routes: counters.routes.clone(),
        }
    }
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_zero_average() {
        let snapshot = RequestMetrics::new().snapshot();
        assert_eq!(snapshot.requests_total, 0);
        assert!(snapshot.average_latency_ms.abs() < f64::EPSILON);
        assert!(snapshot.routes.is_empty());
    }

    #[test]
    fn records_requests_errors_and_latency() {
        let metrics = RequestMetrics::new();

        metrics.record("/api/health", 200, Duration::from_millis(10));
        metrics.record("/api/wikipedia/search", 422, Duration::from_millis(30));
        metrics.record("/api/health", 200, Duration::from_millis(20));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 3);
        assert_eq!(snapshot.errors_total, 1);
        assert!((snapshot.average_latency_ms - 20.0).abs() < 1e-6);
        assert!((snapshot.max_latency_ms - 30.0).abs() < 1e-6);
        assert_eq!(snapshot.routes["/api/health"], 2);
        assert_eq!(snapshot.routes.keys().next().map(String::as_str), Some("/api/health"));
    }

    #[test]
    fn clones_share_counters() {
        let metrics = RequestMetrics::new();
        let clone = metrics.clone();

        clone.record("/x", 500, Duration::ZERO);

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["errors_total"], 1);
        assert_eq!(json["routes"]["/x"], 1);
    }
}
