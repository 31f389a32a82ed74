use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // Pre-register counters so they appear even before the first increment.
    counter!("raw_events_total").absolute(0);
    counter!("noise_filtered_total").absolute(0);
    counter!("alerts_broadcast_total").absolute(0);
    counter!("insider_alerts_total").absolute(0);
    counter!("persist_failures_total").absolute(0);
    counter!("upstream_reconnects_total").absolute(0);
    counter!("age_cache_hits_total").absolute(0);
    counter!("age_cache_misses_total").absolute(0);

    gauge!("ws_subscribers").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("pipeline_latency_seconds").record(0.0);

    handle
}
