use chrono::{DateTime, Local};
use metrics::counter;
use rust_decimal::Decimal;

use crate::db::PositionStore;
use crate::models::{AggregateResult, PositionRow, TradingStatus};

/// Weighted-average entry price and total quantity of a row group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostBasis {
    pub avg_price: Decimal,
    pub total_amount: Decimal,
}

/// Compute PnL for every (trading id, status) group in the store.
///
/// Trading ids come from a fresh read of the table and are visited in
/// sorted order. A failure to enumerate them yields an empty report; a
/// failure to read one group only drops that group.
pub async fn calculate_pnl(store: &dyn PositionStore) -> Vec<AggregateResult> {
    let trading_ids = match store.fetch_trading_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "PnL: failed to enumerate trading ids");
            return Vec::new();
        }
    };
    tracing::info!(count = trading_ids.len(), "Found trading ids");

    let now = Local::now();
    let mut results = Vec::new();

    for trading_id in &trading_ids {
        for status in TradingStatus::ALL {
            let group = match store.fetch_by_trading_id_and_status(trading_id, status).await {
                Ok(group) => group,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        trading_id = %trading_id,
                        status = %status,
                        "PnL: failed to fetch group, skipping"
                    );
                    continue;
                }
            };

            if let Some(result) = aggregate_group(trading_id, status, &group, now) {
                counter!("pnl_results_emitted").increment(1);
                results.push(result);
            }
        }
    }

    tracing::info!(results = results.len(), "PnL calculation complete");
    results
}

/// Turn one group's rows into a report row, or `None` when the group is
/// empty, its representative row has no present price, or its figures do
/// not fit in a `Decimal`.
pub fn aggregate_group(
    trading_id: &str,
    status: TradingStatus,
    rows: &[PositionRow],
    now: DateTime<Local>,
) -> Option<AggregateResult> {
    let rep = representative(rows)?;
    let Some(basis) = weighted_average(rows) else {
        counter!("pnl_groups_overflowed").increment(1);
        tracing::warn!(
            trading_id,
            status = %status,
            rows = rows.len(),
            "Cost basis overflowed, skipping group"
        );
        return None;
    };

    tracing::debug!(
        trading_id,
        status = %status,
        rows = rows.len(),
        avg_price = %basis.avg_price,
        amount = %basis.total_amount,
        "Computed cost basis"
    );

    if basis.total_amount.is_zero() {
        tracing::warn!(
            trading_id,
            status = %status,
            "Group has zero total amount; reporting avg_buy_price as 0"
        );
    }

    let Some(present_price) = rep.present_price else {
        tracing::info!(
            trading_id,
            status = %status,
            row_id = rep.id,
            "No present price on representative row, skipping"
        );
        return None;
    };

    let Some((unrealized_pnl, realized_pnl)) = split_pnl(status, present_price, basis) else {
        counter!("pnl_groups_overflowed").increment(1);
        tracing::warn!(
            trading_id,
            status = %status,
            present_price = %present_price,
            "PnL overflowed, skipping group"
        );
        return None;
    };

    let result = AggregateResult {
        trading_id: trading_id.to_string(),
        status,
        date: rep.created_at,
        token_name: rep.token_id.clone().unwrap_or_default(),
        avg_buy_price: basis.avg_price,
        amount: basis.total_amount,
        unrealized_pnl,
        realized_pnl,
        last_update: now,
    };
    tracing::info!(
        trading_id,
        status = %status,
        token = %result.token_name,
        unrealized_pnl = %result.unrealized_pnl,
        realized_pnl = %result.realized_pnl,
        "Added PnL row"
    );
    Some(result)
}

/// avg = Σ(amount × price) / Σ amount. Rows with a null amount are left out
/// of both sums; rows with a null price only out of the numerator. A zero
/// total amount gives an average of zero. `None` on overflow.
pub fn weighted_average(rows: &[PositionRow]) -> Option<CostBasis> {
    let total_amount = rows
        .iter()
        .filter_map(|r| r.amount)
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))?;
    let weighted = rows
        .iter()
        .filter_map(|r| Some((r.amount?, r.price?)))
        .try_fold(Decimal::ZERO, |acc, (amount, price)| {
            acc.checked_add(amount.checked_mul(price)?)
        })?;

    let avg_price = if total_amount > Decimal::ZERO {
        weighted.checked_div(total_amount)?
    } else {
        Decimal::ZERO
    };

    Some(CostBasis {
        avg_price,
        total_amount,
    })
}

/// The row whose present price, token and date stand for the group: the
/// earliest `created_at` (undated rows last), then the smallest id.
pub fn representative(rows: &[PositionRow]) -> Option<&PositionRow> {
    rows.iter()
        .min_by_key(|r| (r.created_at.is_none(), r.created_at, r.id))
}

/// (unrealized, realized) for a group priced at `present_price`, or `None`
/// on overflow.
pub fn split_pnl(
    status: TradingStatus,
    present_price: Decimal,
    basis: CostBasis,
) -> Option<(Decimal, Decimal)> {
    let pnl = present_price
        .checked_sub(basis.avg_price)?
        .checked_mul(basis.total_amount)?;
    Some(match status {
        TradingStatus::Process => (pnl, Decimal::ZERO),
        TradingStatus::Done => (Decimal::ZERO, pnl),
    })
}
