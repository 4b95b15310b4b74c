pub mod position_repo;

pub use position_repo::PgPositionStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::errors::PnlError;
use crate::models::{PositionRow, TradingStatus};

pub async fn init_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    // Verify connectivity
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

/// Row-level access to the positions table.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Every row in the table. An empty table is an empty vector.
    async fn fetch_all(&self) -> Result<Vec<PositionRow>, PnlError>;

    /// Distinct non-null `trading_id` values, sorted. Reads only that column,
    /// so malformed values elsewhere in a row do not hide its position.
    async fn fetch_trading_ids(&self) -> Result<Vec<String>, PnlError>;

    /// Rows whose `trading_id` and `trading_status` equal the given values.
    async fn fetch_by_trading_id_and_status(
        &self,
        trading_id: &str,
        status: TradingStatus,
    ) -> Result<Vec<PositionRow>, PnlError>;

    /// Overwrite `present_price` on a single row.
    async fn update_present_price(&self, row_id: i64, price: Decimal) -> Result<(), PnlError>;
}
