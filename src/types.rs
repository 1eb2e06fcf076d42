use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supplier-scoped instrument identifier (e.g. `base:0xabc...` for a DEX pair).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentId(pub String);

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstrumentId {
    fn from(s: &str) -> Self {
        InstrumentId(s.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timestamped price/volume observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub ts: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
    /// Pool depth reported by the supplier, when it has one.
    pub liquidity_usd: Option<f64>,
}

impl Tick {
    pub fn new(ts: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            ts,
            price,
            volume,
            liquidity_usd: None,
        }
    }

    pub fn with_liquidity(mut self, liquidity_usd: f64) -> Self {
        self.liquidity_usd = Some(liquidity_usd);
        self
    }

    /// Price must be positive and finite, volume non-negative and finite.
    pub fn is_well_formed(&self) -> bool {
        self.price.is_finite() && self.price > 0.0 && self.volume.is_finite() && self.volume >= 0.0
    }
}

/// A ranked entry from the supplier's candidate scan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: InstrumentId,
    /// Human label, e.g. `PEPE/WETH`.
    pub symbol: String,
    pub score: f64,
}

/// One row of the trade log; written once per fill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub ts: DateTime<Utc>,
    pub instrument: InstrumentId,
    pub price: f64,
    pub side: Side,
    pub pnl_usd: f64,
    pub equity_after: f64,
}

/// Per-instrument roll-up flushed when the controller rotates away.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSummary {
    pub instrument: InstrumentId,
    pub symbol: String,
    pub trade_count: u64,
    pub avg_pnl_usd: f64,
    pub total_pnl_usd: f64,
}

impl InstrumentSummary {
    pub fn from_pnls(instrument: InstrumentId, symbol: String, pnls: &[f64]) -> Self {
        let total: f64 = pnls.iter().sum();
        let avg = if pnls.is_empty() {
            0.0
        } else {
            total / pnls.len() as f64
        };
        Self {
            instrument,
            symbol,
            trade_count: pnls.len() as u64,
            avg_pnl_usd: avg,
            total_pnl_usd: total,
        }
    }
}
