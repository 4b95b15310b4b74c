use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::PositionStore;
use crate::errors::PnlError;
use crate::models::{PositionRow, TradingStatus};

const COLUMNS: &str =
    "id, trading_id, token_id, amount, price, trading_status, present_price, created_at";

/// Postgres-backed position store. The table name is validated by
/// `AppConfig::from_env` before it reaches here.
#[derive(Debug, Clone)]
pub struct PgPositionStore {
    pool: PgPool,
    table: String,
}

impl PgPositionStore {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool,
            table: table.into(),
        }
    }
}

#[async_trait]
impl PositionStore for PgPositionStore {
    async fn fetch_all(&self) -> Result<Vec<PositionRow>, PnlError> {
        let sql = format!("SELECT {COLUMNS} FROM {} ORDER BY id", self.table);
        sqlx::query_as::<_, PositionRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(PnlError::StoreRead)
    }

    async fn fetch_trading_ids(&self) -> Result<Vec<String>, PnlError> {
        let sql = format!(
            "SELECT DISTINCT trading_id FROM {} WHERE trading_id IS NOT NULL ORDER BY trading_id",
            self.table
        );
        sqlx::query_scalar::<_, String>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(PnlError::StoreRead)
    }

    async fn fetch_by_trading_id_and_status(
        &self,
        trading_id: &str,
        status: TradingStatus,
    ) -> Result<Vec<PositionRow>, PnlError> {
        let sql = format!(
            r#"
            SELECT {COLUMNS} FROM {}
            WHERE trading_id = $1 AND trading_status = $2
            ORDER BY created_at ASC NULLS LAST, id ASC
            "#,
            self.table
        );
        sqlx::query_as::<_, PositionRow>(&sql)
            .bind(trading_id)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(PnlError::StoreRead)
    }

    async fn update_present_price(&self, row_id: i64, price: Decimal) -> Result<(), PnlError> {
        let sql = format!("UPDATE {} SET present_price = $2 WHERE id = $1", self.table);
        sqlx::query(&sql)
            .bind(row_id)
            .bind(price)
            .execute(&self.pool)
            .await
            .map_err(|source| PnlError::StoreWrite { id: row_id, source })?;

        Ok(())
    }
}
