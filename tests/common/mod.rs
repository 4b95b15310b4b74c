use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use pnl_reporter::db::PositionStore;
use pnl_reporter::errors::PnlError;
use pnl_reporter::models::{PositionRow, TradingStatus};
use pnl_reporter::pricing::{PriceLookup, PriceSource, TokenAliases};
use pnl_reporter::sheets::{ReportSink, SheetsError};

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Connect to `TEST_DATABASE_URL` and run all migrations. `None` when the
/// variable is unset, so database tests are skipped on machines without one.
#[allow(dead_code)]
pub async fn setup_test_db() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Fresh copy of `trading_table` named `table`, so tests running in
/// parallel do not see each other's rows.
#[allow(dead_code)]
pub async fn create_positions_table(pool: &PgPool, table: &str) {
    sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
        .execute(pool)
        .await
        .expect("Failed to drop test table");
    sqlx::query(&format!("CREATE TABLE {table} (LIKE trading_table INCLUDING ALL)"))
        .execute(pool)
        .await
        .expect("Failed to create test table");
}

/// Insert `row` (its id is ignored) and return the id Postgres assigned.
#[allow(dead_code)]
pub async fn insert_position(pool: &PgPool, table: &str, row: &PositionRow) -> i64 {
    let sql = format!(
        r#"
        INSERT INTO {table}
            (trading_id, token_id, amount, price, trading_status, present_price, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id
        "#
    );
    sqlx::query_scalar::<_, i64>(&sql)
        .bind(&row.trading_id)
        .bind(&row.token_id)
        .bind(row.amount)
        .bind(row.price)
        .bind(&row.trading_status)
        .bind(row.present_price)
        .bind(row.created_at)
        .fetch_one(pool)
        .await
        .expect("Failed to insert position")
}

/// Insert `rows` in order and return their assigned ids.
#[allow(dead_code)]
pub async fn insert_positions(pool: &PgPool, table: &str, rows: &[PositionRow]) -> Vec<i64> {
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        ids.push(insert_position(pool, table, row).await);
    }
    ids
}

// ---------------------------------------------------------------------------
// Position store
// ---------------------------------------------------------------------------

/// In-memory positions table with switchable read failures, per-group read
/// failures and per-row write failures.
#[allow(dead_code)]
#[derive(Default)]
pub struct InMemoryStore {
    rows: Mutex<Vec<PositionRow>>,
    fail_reads: AtomicBool,
    failing_groups: HashSet<(String, TradingStatus)>,
    failing_writes: HashSet<i64>,
}

#[allow(dead_code)]
impl InMemoryStore {
    pub fn new(rows: Vec<PositionRow>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn with_failing_writes(mut self, ids: &[i64]) -> Self {
        self.failing_writes = ids.iter().copied().collect();
        self
    }

    pub fn with_failing_group(mut self, trading_id: &str, status: TradingStatus) -> Self {
        self.failing_groups.insert((trading_id.to_string(), status));
        self
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn row(&self, id: i64) -> PositionRow {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .expect("row should exist")
    }

    fn check_reads(&self) -> Result<(), PnlError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(PnlError::StoreRead(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl PositionStore for InMemoryStore {
    async fn fetch_all(&self) -> Result<Vec<PositionRow>, PnlError> {
        self.check_reads()?;
        let mut rows = self.rows.lock().unwrap().clone();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn fetch_trading_ids(&self) -> Result<Vec<String>, PnlError> {
        self.check_reads()?;
        let ids: BTreeSet<String> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.trading_id.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn fetch_by_trading_id_and_status(
        &self,
        trading_id: &str,
        status: TradingStatus,
    ) -> Result<Vec<PositionRow>, PnlError> {
        self.check_reads()?;
        if self.failing_groups.contains(&(trading_id.to_string(), status)) {
            return Err(PnlError::StoreRead(sqlx::Error::RowNotFound));
        }
        let mut rows: Vec<PositionRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.trading_id.as_deref() == Some(trading_id)
                    && r.trading_status.as_deref() == Some(status.as_str())
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.created_at.is_none(), r.created_at, r.id));
        Ok(rows)
    }

    async fn update_present_price(&self, row_id: i64, price: Decimal) -> Result<(), PnlError> {
        if self.failing_writes.contains(&row_id) {
            return Err(PnlError::StoreWrite {
                id: row_id,
                source: sqlx::Error::PoolClosed,
            });
        }
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == row_id) {
            row.present_price = Some(price);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Price source
// ---------------------------------------------------------------------------

/// Fixed USD quotes keyed by canonical symbol; records every query.
#[allow(dead_code)]
#[derive(Default)]
pub struct StaticPrices {
    prices: HashMap<String, Decimal>,
    pub calls: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl StaticPrices {
    pub fn new(prices: &[(&str, i64)]) -> Self {
        Self {
            prices: prices
                .iter()
                .map(|(s, p)| (s.to_string(), Decimal::from(*p)))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PriceSource for StaticPrices {
    async fn usd_price(&self, symbol: &str) -> Result<Decimal, PnlError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| PnlError::price_unavailable(symbol, "no price data returned"))
    }
}

#[allow(dead_code)]
pub fn lookup(source: Arc<StaticPrices>) -> PriceLookup {
    PriceLookup::new(source, TokenAliases::builtin())
}

// ---------------------------------------------------------------------------
// Report sink
// ---------------------------------------------------------------------------

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Clear,
    Write { start_cell: String, rows: Vec<Vec<Value>> },
}

#[derive(Default)]
pub struct RecordingSink {
    pub calls: Mutex<Vec<SinkCall>>,
    fail_writes: bool,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    /// All written rows in sheet order, header included.
    pub fn written_rows(&self) -> Vec<Vec<Value>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::Write { rows, .. } => Some(rows),
                SinkCall::Clear => None,
            })
            .flatten()
            .collect()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn clear(&self) -> Result<(), SheetsError> {
        self.calls.lock().unwrap().push(SinkCall::Clear);
        Ok(())
    }

    async fn write_rows(&self, start_cell: &str, rows: &[Vec<Value>]) -> Result<(), SheetsError> {
        if self.fail_writes {
            return Err(SheetsError::Api {
                status: 403,
                body: "permission denied".into(),
            });
        }
        self.calls.lock().unwrap().push(SinkCall::Write {
            start_cell: start_cell.to_string(),
            rows: rows.to_vec(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A position row created `id` minutes after a fixed epoch, so lower ids are
/// earlier.
#[allow(dead_code)]
pub fn position(
    id: i64,
    trading_id: &str,
    token_id: &str,
    amount: Option<i64>,
    price: Option<i64>,
    status: &str,
) -> PositionRow {
    let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    PositionRow {
        id,
        trading_id: Some(trading_id.to_string()),
        token_id: Some(token_id.to_string()),
        amount: amount.map(Decimal::from),
        price: price.map(Decimal::from),
        trading_status: Some(status.to_string()),
        present_price: None,
        created_at: Some(base + Duration::minutes(id)),
    }
}
