//! Service counters with Prometheus text exposition
//!
//! A small registry of atomic counters incremented by the API layer and the
//! background services, exported at `GET /metrics`.

use std::sync::atomic::{AtomicU64, Ordering};

pub struct MetricsRegistry {
    pub http_requests_total: AtomicU64,
    pub entries_total: AtomicU64,
    pub randomness_requests_total: AtomicU64,
    pub rounds_completed_total: AtomicU64,
    pub payout_failures_total: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            http_requests_total: AtomicU64::new(0),
            entries_total: AtomicU64::new(0),
            randomness_requests_total: AtomicU64::new(0),
            rounds_completed_total: AtomicU64::new(0),
            payout_failures_total: AtomicU64::new(0),
        }
    }

    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Prometheus text exposition format (version 0.0.4).
    pub fn to_prometheus_format(&self) -> String {
        let counters = [
            (
                "tombola_http_requests_total",
                "Total HTTP requests handled",
                &self.http_requests_total,
            ),
            (
                "tombola_entries_total",
                "Total accepted raffle entries",
                &self.entries_total,
            ),
            (
                "tombola_randomness_requests_total",
                "Total randomness requests issued",
                &self.randomness_requests_total,
            ),
            (
                "tombola_rounds_completed_total",
                "Total rounds settled with a winner",
                &self.rounds_completed_total,
            ),
            (
                "tombola_payout_failures_total",
                "Total payouts rejected by the transfer sink",
                &self.payout_failures_total,
            ),
        ];

        let mut out = String::new();
        for (name, help, counter) in counters {
            out.push_str(&format!("# HELP {name} {help}\n"));
            out.push_str(&format!("# TYPE {name} counter\n"));
            out.push_str(&format!("{name} {}\n", counter.load(Ordering::Relaxed)));
        }
        out
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
