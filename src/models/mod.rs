pub mod position;
pub mod report;

pub use position::PositionRow;
pub use report::AggregateResult;

use std::fmt;

// ---------------------------------------------------------------------------
// TradingStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TradingStatus {
    /// Open position: PnL is unrealized.
    Process,
    /// Closed position: PnL is realized.
    Done,
}

impl TradingStatus {
    pub const ALL: [TradingStatus; 2] = [TradingStatus::Process, TradingStatus::Done];

    /// Exact match against the stored value; anything else is not a status.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "process" => Some(TradingStatus::Process),
            "done" => Some(TradingStatus::Done),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradingStatus::Process => "process",
            TradingStatus::Done => "done",
        }
    }
}

impl fmt::Display for TradingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
