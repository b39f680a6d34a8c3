use parking_lot::Mutex;
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::seed::rng_for;
use crate::RequestFailure;

/// Latency samples kept per label for percentiles. Older samples are replaced
/// by reservoir sampling once the cap is hit; count/min/avg/max stay exact.
pub const DEFAULT_SAMPLE_CAP: usize = 10_000;

#[derive(Debug, Default)]
struct LabelStats {
    action: Option<&'static str>,
    requests: u64,
    failures: u64,
    failure_kinds: BTreeMap<&'static str, u64>,
    sum_ms: f64,
    min_ms: Option<f64>,
    max_ms: Option<f64>,
    samples_ms: Vec<f64>,
}

impl LabelStats {
    fn observe(&mut self, ms: f64, failure: Option<&RequestFailure>, cap: usize, rng: &mut ChaCha20Rng) {
        self.requests += 1;
        self.sum_ms += ms;
        self.min_ms = Some(self.min_ms.map_or(ms, |m| m.min(ms)));
        self.max_ms = Some(self.max_ms.map_or(ms, |m| m.max(ms)));
        if let Some(f) = failure {
            self.failures += 1;
            *self.failure_kinds.entry(f.kind()).or_insert(0) += 1;
        }

        // reservoir: the n-th sample survives with probability cap / n
        if self.samples_ms.len() < cap {
            self.samples_ms.push(ms);
        } else {
            let slot = rng.gen_range(0..self.requests) as usize;
            if slot < cap {
                self.samples_ms[slot] = ms;
            }
        }
    }
}

#[derive(Debug)]
struct Inner {
    labels: BTreeMap<String, LabelStats>,
    total: LabelStats,
    rng: ChaCha20Rng,
}

/// Per-label request aggregation shared by all virtual users of a run.
#[derive(Debug)]
pub struct RequestStats {
    inner: Mutex<Inner>,
    sample_cap: usize,
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::with_sample_cap(DEFAULT_SAMPLE_CAP)
    }
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_cap(sample_cap: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                labels: BTreeMap::new(),
                total: LabelStats::default(),
                rng: rng_for(0, "stats/reservoir"),
            }),
            sample_cap: sample_cap.max(1),
        }
    }

    /// Records one finished request and mirrors it into the Prometheus collectors.
    pub fn record(
        &self,
        label: &str,
        action: &'static str,
        elapsed: Duration,
        failure: Option<&RequestFailure>,
    ) {
        swarm_metrics::REQUESTS_TOTAL.with_label_values(&[label]).inc();
        swarm_metrics::REQUEST_DURATION_SECONDS
            .with_label_values(&[label])
            .observe(elapsed.as_secs_f64());
        if let Some(f) = failure {
            swarm_metrics::REQUEST_FAILURES_TOTAL
                .with_label_values(&[label, f.kind()])
                .inc();
        }

        let ms = elapsed.as_micros() as f64 / 1000.0;
        let cap = self.sample_cap;
        let mut guard = self.inner.lock();
        let Inner { labels, total, rng } = &mut *guard;

        let entry = labels.entry(label.to_string()).or_default();
        entry.action.get_or_insert(action);
        entry.observe(ms, failure, cap, rng);
        total.observe(ms, failure, cap, rng);
    }

    pub fn total_requests(&self) -> u64 {
        self.inner.lock().total.requests
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let guard = self.inner.lock();
        let labels = guard
            .labels
            .iter()
            .map(|(label, stats)| LabelSummary::build(label.clone(), stats))
            .collect();
        let total = LabelSummary::build("Aggregated".to_string(), &guard.total);
        StatsSnapshot { labels, total }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelSummary {
    pub label: String,
    /// Action name (`homepage`, ...). None on the aggregated row.
    pub action: Option<String>,
    pub requests: u64,
    pub failures: u64,
    pub failure_ratio: f64,
    pub failure_kinds: BTreeMap<String, u64>,
    pub min_ms: Option<f64>,
    pub avg_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

impl LabelSummary {
    fn build(label: String, stats: &LabelStats) -> Self {
        let mut sorted = stats.samples_ms.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let (avg_ms, failure_ratio) = if stats.requests == 0 {
            (None, 0.0)
        } else {
            (
                Some(stats.sum_ms / stats.requests as f64),
                stats.failures as f64 / stats.requests as f64,
            )
        };

        Self {
            label,
            action: stats.action.map(str::to_string),
            requests: stats.requests,
            failures: stats.failures,
            failure_ratio,
            failure_kinds: stats
                .failure_kinds
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            min_ms: stats.min_ms,
            avg_ms,
            max_ms: stats.max_ms,
            p50_ms: percentile(&sorted, 0.50),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub labels: Vec<LabelSummary>,
    pub total: LabelSummary,
}

impl StatsSnapshot {
    pub fn label(&self, label: &str) -> Option<&LabelSummary> {
        self.labels.iter().find(|l| l.label == label)
    }
}

/// Nearest-rank percentile over an ascending slice.
pub fn percentile(sorted: &[f64], quantile: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (sorted.len() as f64 * quantile).ceil() as usize;
    let idx = rank.clamp(1, sorted.len()) - 1;
    Some(sorted[idx])
}
