//! In-process counters and histograms for the filter loop.
//!
//! Values are rendered in the Prometheus text exposition format by the
//! `/metrics` route.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::{Mutex, PoisonError};

pub const LINES_READ: &str = "lines_read_from_input";
pub const LINES_PARSE_ERROR: &str = "lines_parse_error";
pub const LINES_PARSED: &str = "lines_parsed";
pub const LINES_PUBLISHED: &str = "lines_parsed_and_published";
pub const LINES_NOT_PUBLISHED: &str = "lines_parsed_but_not_published";
pub const LINES_WRITTEN: &str = "lines_output_written";
pub const LINES_WRITE_ERROR: &str = "lines_output_write_error";
pub const PUBLISH_DURATION_US: &str = "message_publish_duration_us";

const NAMESPACE: &str = "gtmcdc";

/// Upper bounds (microseconds) of the publish latency buckets.
const BUCKETS: &[f64] = &[
    50.0, 100.0, 250.0, 500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 50_000.0, 250_000.0,
    1_000_000.0,
];

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Cumulative counts per bucket in `BUCKETS`.
    pub buckets: Vec<u64>,
    pub count: u64,
    pub sum: f64,
}

impl Histogram {
    fn new() -> Self {
        Self {
            buckets: vec![0; BUCKETS.len()],
            count: 0,
            sum: 0.0,
        }
    }

    fn observe(&mut self, value: f64) {
        for (bucket, bound) in self.buckets.iter_mut().zip(BUCKETS) {
            if value <= *bound {
                *bucket += 1;
            }
        }
        self.count += 1;
        self.sum += value;
    }
}

#[derive(Debug, Default)]
pub struct Metrics {
    counters: Mutex<BTreeMap<&'static str, u64>>,
    histograms: Mutex<BTreeMap<&'static str, Histogram>>,
}

impl Metrics {
    pub fn new() -> Self {
        let metrics = Self::default();
        // pre-register so scrapes show zeros before the first line arrives
        {
            let mut counters = metrics.counters.lock().unwrap_or_else(PoisonError::into_inner);
            for name in [
                LINES_READ,
                LINES_PARSE_ERROR,
                LINES_PARSED,
                LINES_PUBLISHED,
                LINES_NOT_PUBLISHED,
                LINES_WRITTEN,
                LINES_WRITE_ERROR,
            ] {
                counters.insert(name, 0);
            }
        }
        metrics
    }

    pub fn incr_counter(&self, name: &'static str) {
        *self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name)
            .or_insert(0) += 1;
    }

    pub fn counter_value(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn observe(&self, name: &'static str, value: f64) {
        self.histograms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name)
            .or_insert_with(Histogram::new)
            .observe(value);
    }

    #[cfg(test)]
    pub fn histogram(&self, name: &str) -> Option<Histogram> {
        self.histograms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Prometheus text exposition of every metric.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();

        let counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        for (name, value) in counters.iter() {
            let _ = writeln!(out, "# TYPE {NAMESPACE}_{name} counter");
            let _ = writeln!(out, "{NAMESPACE}_{name} {value}");
        }

        let histograms = self.histograms.lock().unwrap_or_else(PoisonError::into_inner);
        for (name, hist) in histograms.iter() {
            let _ = writeln!(out, "# TYPE {NAMESPACE}_{name} histogram");
            for (bound, count) in BUCKETS.iter().zip(&hist.buckets) {
                let _ = writeln!(out, "{NAMESPACE}_{name}_bucket{{le=\"{bound}\"}} {count}");
            }
            let _ = writeln!(out, "{NAMESPACE}_{name}_bucket{{le=\"+Inf\"}} {}", hist.count);
            let _ = writeln!(out, "{NAMESPACE}_{name}_sum {}", hist.sum);
            let _ = writeln!(out, "{NAMESPACE}_{name}_count {}", hist.count);
        }

        out
    }
}
