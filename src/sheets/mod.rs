pub mod auth;
pub mod client;

pub use auth::ServiceAccount;
pub use client::GoogleSheet;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("failed to read service account credentials: {0}")]
    Credentials(#[from] std::io::Error),

    #[error("invalid service account credentials: {0}")]
    CredentialsFormat(#[from] serde_json::Error),

    #[error("failed to sign token assertion: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),

    #[error("sheets API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// A tabular destination that can be wiped and written row-wise.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Remove every value from the target tab.
    async fn clear(&self) -> Result<(), SheetsError>;

    /// Write `rows` starting at `start_cell` (A1 notation, e.g. `A2`).
    async fn write_rows(&self, start_cell: &str, rows: &[Vec<Value>]) -> Result<(), SheetsError>;
}

/// Sink used for dry runs: rows go to the log instead of a sheet.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl ReportSink for LogSink {
    async fn clear(&self) -> Result<(), SheetsError> {
        tracing::info!("[DRY-RUN] Would clear report sheet");
        Ok(())
    }

    async fn write_rows(&self, start_cell: &str, rows: &[Vec<Value>]) -> Result<(), SheetsError> {
        for (offset, row) in rows.iter().enumerate() {
            let cells = Value::Array(row.clone());
            tracing::info!(
                start_cell,
                offset,
                row = %cells,
                "[DRY-RUN] Would write report row"
            );
        }
        Ok(())
    }
}
