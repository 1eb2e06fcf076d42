use crate::types::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod paper;

pub use paper::PaperExecutor;

/// The single open position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_price: f64,
    /// Notional after the entry fee.
    pub size_usd: f64,
    pub opened_at: DateTime<Utc>,
    pub stop_price: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub side: Side,
    pub ts: DateTime<Utc>,
    /// Execution price after slippage.
    pub price: f64,
    /// Notional the fee was charged on.
    pub notional_usd: f64,
    pub fee_usd: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub position: Position,
    pub exit: Fill,
    pub pnl_usd: f64,
}

impl ClosedTrade {
    pub fn holding_secs(&self) -> i64 {
        (self.exit.ts - self.position.opened_at).num_seconds().max(0)
    }
}

/// Where fills come from. Implementations hold at most one position.
///
/// Both calls are no-ops returning `None` when the venue is in the wrong
/// state; they never panic or unwind the caller's loop.
pub trait ExecutionVenue: Send {
    fn position(&self) -> Option<&Position>;

    fn has_open(&self) -> bool {
        self.position().is_some()
    }

    fn buy(&mut self, price: f64, notional_usd: f64, stop_price: f64, ts: DateTime<Utc>) -> Option<Fill>;

    fn close(&mut self, price: f64, ts: DateTime<Utc>) -> Option<ClosedTrade>;
}
