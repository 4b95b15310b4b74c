use metrics::{counter, gauge};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Number, Value};

use crate::errors::PnlError;
use crate::models::AggregateResult;
use crate::sheets::ReportSink;

pub const REPORT_HEADER: [&str; 7] = [
    "date",
    "token_name",
    "avg_buy_price",
    "amount",
    "unrealized_pnl",
    "realized_pnl",
    "last_update",
];

pub fn header_row() -> Vec<Value> {
    REPORT_HEADER.iter().map(|h| Value::from(*h)).collect()
}

/// Render results as sheet rows, in the order given.
pub fn report_rows(results: &[AggregateResult]) -> Vec<Vec<Value>> {
    results
        .iter()
        .map(|r| {
            vec![
                Value::from(r.date_cell()),
                Value::from(r.token_name.clone()),
                decimal_cell(r.avg_buy_price),
                decimal_cell(r.amount),
                decimal_cell(r.unrealized_pnl),
                decimal_cell(r.realized_pnl),
                Value::from(r.last_update_cell()),
            ]
        })
        .collect()
}

/// Numeric cell; anything not representable as a finite number becomes 0.
fn decimal_cell(value: Decimal) -> Value {
    value
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::from(0))
}

/// Replace the sink's contents with the header at A1 and one row per result
/// from A2. With no results only the header is written.
pub async fn publish_report(
    sink: &dyn ReportSink,
    results: &[AggregateResult],
) -> Result<(), PnlError> {
    let rows = report_rows(results);
    if rows.is_empty() {
        tracing::info!("No PnL rows; publishing header only");
    }

    let outcome = async {
        sink.clear().await?;
        sink.write_rows("A1", &[header_row()]).await?;
        if !rows.is_empty() {
            sink.write_rows("A2", &rows).await?;
        }
        Ok::<_, PnlError>(())
    }
    .await;

    match &outcome {
        Ok(()) => {
            gauge!("report_rows").set(rows.len() as f64);
            tracing::info!(rows = rows.len(), "Report published");
        }
        Err(_) => counter!("report_publish_failures").increment(1),
    }
    outcome
}
