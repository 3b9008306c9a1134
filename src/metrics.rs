use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("item_queries_total").absolute(0);
    counter!("refresh_failures_total").absolute(0);

    gauge!("catalog_items").set(0.0);

    histogram!("query_latency_seconds").record(0.0);
    histogram!("refresh_duration_seconds").record(0.0);

    Ok(handle)
}

/// A handle backed by a recorder that is not installed globally. Lets tests
/// build any number of routers in one process.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}
