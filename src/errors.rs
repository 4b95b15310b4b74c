use crate::sheets::SheetsError;

/// Failures raised at the boundary of each external collaborator. Callers
/// log them and skip the affected unit of work; none of them aborts a run.
#[derive(Debug, thiserror::Error)]
pub enum PnlError {
    #[error("price unavailable for {symbol}: {reason}")]
    PriceUnavailable { symbol: String, reason: String },

    #[error("position store read failed: {0}")]
    StoreRead(#[source] sqlx::Error),

    #[error("position store write failed for row {id}: {source}")]
    StoreWrite {
        id: i64,
        #[source]
        source: sqlx::Error,
    },

    #[error("report publish failed: {0}")]
    Publish(#[from] SheetsError),
}

impl PnlError {
    pub fn price_unavailable(symbol: &str, reason: impl ToString) -> Self {
        PnlError::PriceUnavailable {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }
}
