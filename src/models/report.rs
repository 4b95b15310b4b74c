use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;

use super::TradingStatus;

/// Timestamp format for the `last_update` report column.
pub const LAST_UPDATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the PnL report: a (trading id, status) group priced at the
/// representative row's present price.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub trading_id: String,
    pub status: TradingStatus,
    pub date: Option<DateTime<Utc>>,
    pub token_name: String,
    pub avg_buy_price: Decimal,
    pub amount: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub last_update: DateTime<Local>,
}

impl AggregateResult {
    pub fn date_cell(&self) -> String {
        self.date.map(|d| d.to_rfc3339()).unwrap_or_default()
    }

    pub fn last_update_cell(&self) -> String {
        self.last_update.format(LAST_UPDATE_FORMAT).to_string()
    }
}
