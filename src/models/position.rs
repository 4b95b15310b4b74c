use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use super::TradingStatus;

/// Database row for the positions table. One row per trade event; rows that
/// share a `trading_id` form one logical position.
#[derive(Debug, Clone, FromRow)]
pub struct PositionRow {
    pub id: i64,
    pub trading_id: Option<String>,
    pub token_id: Option<String>,
    pub amount: Option<Decimal>,
    pub price: Option<Decimal>,
    pub trading_status: Option<String>,
    pub present_price: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PositionRow {
    /// Parsed lifecycle status; unknown values are inert.
    pub fn status(&self) -> Option<TradingStatus> {
        self.trading_status
            .as_deref()
            .and_then(TradingStatus::from_db_str)
    }
}
