use lazy_static::lazy_static;
use prometheus::{
    opts, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    // 레지스트리 등록은 register_custom_metrics 에서 수동으로 수행한다.

    /// Requests issued, by action label.
    pub static ref REQUESTS_TOTAL: IntCounterVec =
        IntCounterVec::new(Opts::new("swarm_requests_total", "Total requests issued by virtual users"), &[
            "label",
        ])
        .unwrap();

    /// Failed requests, by action label and failure kind (status/timeout/connection/request).
    pub static ref REQUEST_FAILURES_TOTAL: IntCounterVec =
        IntCounterVec::new(
            Opts::new("swarm_request_failures_total", "Total failed requests by label and kind"),
            &["label", "kind"],
        )
        .unwrap();

    pub static ref REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "swarm_request_duration_seconds",
            "Response time of virtual user requests (seconds)",
        )
        .buckets(vec![
            0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0,
        ]),
        &["label"],
    )
    .unwrap();

    /// Virtual users currently running.
    pub static ref ACTIVE_USERS: IntGauge =
        IntGauge::with_opts(opts!("swarm_active_users", "Number of running virtual users")).unwrap();

    /// Concurrency target reported by the load shape on the last tick.
    pub static ref TARGET_USERS: IntGauge =
        IntGauge::with_opts(opts!("swarm_target_users", "Target number of virtual users")).unwrap();

    pub static ref USERS_SPAWNED_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("swarm_users_spawned_total", "Total virtual users spawned")).unwrap();

    pub static ref USERS_STOPPED_TOTAL: IntCounter =
        IntCounter::with_opts(opts!("swarm_users_stopped_total", "Total virtual users stopped")).unwrap();
}

/// Registers all swarm metrics to the given registry.
///
/// Collectors are process-global, so registering them into several registries
/// (one per run) is allowed; values keep accumulating across runs.
pub fn register_custom_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(REQUESTS_TOTAL.clone()))?;
    registry.register(Box::new(REQUEST_FAILURES_TOTAL.clone()))?;
    registry.register(Box::new(REQUEST_DURATION_SECONDS.clone()))?;
    registry.register(Box::new(ACTIVE_USERS.clone()))?;
    registry.register(Box::new(TARGET_USERS.clone()))?;
    registry.register(Box::new(USERS_SPAWNED_TOTAL.clone()))?;
    registry.register(Box::new(USERS_STOPPED_TOTAL.clone()))?;
    Ok(())
}

/// Renders the registry in the Prometheus text exposition format.
pub fn render_text(registry: &Registry) -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_into_independent_registries() {
        let first = Registry::new();
        let second = Registry::new();
        register_custom_metrics(&first).unwrap();
        register_custom_metrics(&second).unwrap();

        // 같은 레지스트리에 두 번 등록하면 실패해야 한다
        assert!(register_custom_metrics(&first).is_err());
    }

    #[test]
    fn rendered_text_contains_labels() {
        let registry = Registry::new();
        register_custom_metrics(&registry).unwrap();
        REQUESTS_TOTAL.with_label_values(&["GET /"]).inc();
        REQUEST_FAILURES_TOTAL
            .with_label_values(&["GET /", "timeout"])
            .inc();

        let text = render_text(&registry).unwrap();
        assert!(text.contains("swarm_requests_total{label=\"GET /\"}"));
        assert!(text.contains("kind=\"timeout\""));
    }
}
