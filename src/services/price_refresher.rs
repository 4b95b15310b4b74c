use std::collections::{BTreeSet, HashMap};

use futures_util::stream::{self, StreamExt};
use metrics::counter;
use rust_decimal::Decimal;

use crate::db::PositionStore;
use crate::pricing::PriceLookup;

/// Outcome counts of one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub rows: usize,
    pub updated: usize,
    /// Rows left untouched because their symbol had no price.
    pub skipped: usize,
    pub failed_writes: usize,
}

/// Look up the current price of every stored token and write it to the
/// row's `present_price`. Each distinct canonical symbol is priced once;
/// failures are logged and only affect the rows that depend on them.
pub async fn refresh_present_prices(
    store: &dyn PositionStore,
    prices: &PriceLookup,
    concurrency: usize,
) -> RefreshSummary {
    let rows = match store.fetch_all().await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, "Price refresh: failed to fetch position rows");
            return RefreshSummary::default();
        }
    };
    tracing::info!(rows = rows.len(), "Fetched position rows");

    let mut summary = RefreshSummary {
        rows: rows.len(),
        ..Default::default()
    };
    if rows.is_empty() {
        return summary;
    }

    let symbols: BTreeSet<String> = rows
        .iter()
        .filter_map(|row| row.token_id.as_deref())
        .map(|token_id| prices.canonical_symbol(token_id))
        .collect();
    let quotes = fetch_quotes(prices, symbols, concurrency).await;

    for row in &rows {
        let status = row.status().map_or("inert", |s| s.as_str());
        let Some(token_id) = row.token_id.as_deref() else {
            tracing::warn!(row_id = row.id, status, "Skipped present_price update: no token_id");
            summary.skipped += 1;
            continue;
        };

        let symbol = prices.canonical_symbol(token_id);
        let Some(price) = quotes.get(&symbol).copied() else {
            tracing::warn!(
                row_id = row.id,
                token_id,
                symbol = %symbol,
                status,
                "Skipped present_price update: price unavailable"
            );
            summary.skipped += 1;
            continue;
        };

        match store.update_present_price(row.id, price).await {
            Ok(()) => {
                counter!("present_price_updates").increment(1);
                tracing::info!(
                    row_id = row.id,
                    token_id,
                    price = %price,
                    status,
                    "Updated present_price"
                );
                summary.updated += 1;
            }
            Err(e) => {
                counter!("present_price_update_failures").increment(1);
                tracing::error!(error = %e, row_id = row.id, "Failed to update present_price");
                summary.failed_writes += 1;
            }
        }
    }

    tracing::info!(
        updated = summary.updated,
        skipped = summary.skipped,
        failed_writes = summary.failed_writes,
        "Price refresh complete"
    );
    summary
}

/// Price each symbol, at most `concurrency` requests in flight. Symbols
/// that fail are absent from the returned map.
async fn fetch_quotes(
    prices: &PriceLookup,
    symbols: BTreeSet<String>,
    concurrency: usize,
) -> HashMap<String, Decimal> {
    stream::iter(symbols)
        .map(|symbol| async move {
            counter!("price_lookups_total").increment(1);
            let result = prices.price_of(&symbol).await;
            (symbol, result)
        })
        .buffer_unordered(concurrency.max(1))
        .filter_map(|(symbol, result)| async move {
            match result {
                Ok(price) => {
                    tracing::debug!(symbol = %symbol, price = %price, "Fetched price");
                    Some((symbol, price))
                }
                Err(e) => {
                    counter!("price_lookups_failed").increment(1);
                    tracing::warn!(error = %e, symbol = %symbol, "Price lookup failed");
                    None
                }
            }
        })
        .collect()
        .await
}
