use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and register all run metrics.
/// The returned handle's `render()` gives a text snapshot of the run.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("price_lookups_total").absolute(0);
    counter!("price_lookups_failed").absolute(0);
    counter!("present_price_updates").absolute(0);
    counter!("present_price_update_failures").absolute(0);
    counter!("pnl_results_emitted").absolute(0);
    counter!("pnl_groups_overflowed").absolute(0);
    counter!("report_publish_failures").absolute(0);

    gauge!("report_rows").set(0.0);

    Ok(handle)
}
