pub mod pnl_aggregator;
pub mod price_refresher;
pub mod report_publisher;

use crate::db::PositionStore;
use crate::pricing::PriceLookup;
use crate::sheets::ReportSink;

pub use price_refresher::RefreshSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub refresh: RefreshSummary,
    pub results: usize,
    pub published: bool,
}

/// One batch run: refresh present prices, aggregate PnL, publish the report.
/// Every step runs regardless of failures in the step before it.
pub async fn run_once(
    store: &dyn PositionStore,
    prices: &PriceLookup,
    sink: &dyn ReportSink,
    price_lookup_concurrency: usize,
) -> RunSummary {
    tracing::info!("Refreshing present prices");
    let refresh =
        price_refresher::refresh_present_prices(store, prices, price_lookup_concurrency).await;

    tracing::info!("Calculating PnL");
    let results = pnl_aggregator::calculate_pnl(store).await;

    tracing::info!(rows = results.len(), "Publishing report");
    let published = match report_publisher::publish_report(sink, &results).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Failed to publish report");
            false
        }
    };

    RunSummary {
        refresh,
        results: results.len(),
        published,
    }
}
