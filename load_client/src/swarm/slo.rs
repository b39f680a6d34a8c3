use serde::{Deserialize, Serialize};

use super::stats::StatsSnapshot;

/// Pass/fail gate evaluated over the aggregated statistics at run end.
/// Every threshold is optional; an empty table always passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SloThresholds {
    /// Maximum tolerated failures / requests over all labels (0.0..=1.0)
    pub max_failure_ratio: Option<f64>,
    /// Maximum tolerated aggregated p95 response time
    pub p95_ms: Option<f64>,
    /// Minimum number of requests the run must have produced
    pub min_requests: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SloReport {
    pub total_requests: u64,
    pub failure_ratio: f64,
    pub p95_ms: Option<f64>,
    pub passed: bool,
    pub details: Vec<String>,
}

pub fn evaluate_slo(stats: &StatsSnapshot, th: &SloThresholds) -> SloReport {
    let total = &stats.total;
    let mut passed = true;
    let mut details = Vec::new();

    if let Some(max_ratio) = th.max_failure_ratio {
        if total.failure_ratio > max_ratio {
            passed = false;
            details.push(format!(
                "failure ratio {:.4} > {:.4}",
                total.failure_ratio, max_ratio
            ));
        }
        // 어느 라벨이 실패를 만들었는지 같이 남긴다
        for label in stats.labels.iter().filter(|l| l.failure_ratio > max_ratio) {
            details.push(format!(
                "{}: {}/{} failed ({:?})",
                label.label, label.failures, label.requests, label.failure_kinds
            ));
        }
    }

    if let Some(limit) = th.p95_ms {
        match total.p95_ms {
            Some(v) if v > limit => {
                passed = false;
                details.push(format!("p95 {:.1}ms > {:.1}ms", v, limit));
            }
            Some(_) => {}
            None => details.push("p95 unavailable (no requests)".into()),
        }
    }

    if let Some(min) = th.min_requests {
        if total.requests < min {
            passed = false;
            details.push(format!("requests {} < {}", total.requests, min));
        }
    }

    SloReport {
        total_requests: total.requests,
        failure_ratio: total.failure_ratio,
        p95_ms: total.p95_ms,
        passed,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swarm::stats::RequestStats;
    use crate::RequestFailure;
    use std::time::Duration;

    fn sample_stats() -> StatsSnapshot {
        let stats = RequestStats::new();
        for ms in 1..=19 {
            stats.record("GET /", "homepage", Duration::from_millis(ms), None);
        }
        stats.record(
            "GET /rest/products/:id",
            "product_details",
            Duration::from_millis(500),
            Some(&RequestFailure::Status(404)),
        );
        stats.snapshot()
    }

    #[test]
    fn empty_thresholds_pass() {
        let report = evaluate_slo(&sample_stats(), &SloThresholds::default());
        assert!(report.passed);
        assert!(report.details.is_empty());
        assert_eq!(report.total_requests, 20);
    }

    #[test]
    fn failure_ratio_gate_names_the_label() {
        let th = SloThresholds {
            max_failure_ratio: Some(0.01),
            ..Default::default()
        };
        let report = evaluate_slo(&sample_stats(), &th);
        assert!(!report.passed);
        assert!(report
            .details
            .iter()
            .any(|d| d.starts_with("GET /rest/products/:id")));
    }

    #[test]
    fn p95_and_volume_gates() {
        // 20 samples: p95 = 19th value = 19ms
        let ok = SloThresholds {
            p95_ms: Some(19.0),
            min_requests: Some(20),
            ..Default::default()
        };
        assert!(evaluate_slo(&sample_stats(), &ok).passed);

        let strict = SloThresholds {
            p95_ms: Some(10.0),
            min_requests: Some(21),
            ..Default::default()
        };
        let report = evaluate_slo(&sample_stats(), &strict);
        assert!(!report.passed);
        assert_eq!(report.details.len(), 2);
    }
}
