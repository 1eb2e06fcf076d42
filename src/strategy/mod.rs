//! Entry policies.
//!
//! A strategy only looks at a [`Snapshot`]; it never sees the position or the
//! ledger, and the controller does not ask it anything while a position is
//! open. Exits are the controller's job (stop, time cap, take profit).

use crate::features::Snapshot;
use serde::{Deserialize, Serialize};

pub mod momentum_breakout;
pub mod random_baseline;
pub mod threshold;

pub use momentum_breakout::MomentumBreakout;
pub use random_baseline::RandomBaseline;
pub use threshold::ThresholdMomentum;

/// Exit parameters attached to an entry signal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderTemplate {
    /// Fractional stop distance below entry (0.05 = 5%).
    pub stop_pct: f64,
    pub time_cap_sec: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    Hold,
    Enter(OrderTemplate),
}

impl Decision {
    pub fn is_enter(&self) -> bool {
        matches!(self, Decision::Enter(_))
    }

    pub fn order(&self) -> Option<OrderTemplate> {
        match self {
            Decision::Enter(o) => Some(*o),
            Decision::Hold => None,
        }
    }
}

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn decide(&self, snap: &Snapshot) -> Decision;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyKind {
    #[default]
    MomentumBreakout,
    Threshold,
    RandomBaseline,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    /// Minimum short-window return, fractional.
    #[serde(rename = "ret3mThreshold")]
    pub ret3m_threshold: f64,
    pub vol_impulse_threshold: f64,
    pub breakout_lookback_min: f64,
    pub min_liquidity_usd: f64,
    pub max_spread_pct: f64,
    #[serde(rename = "holderTop10MaxPct")]
    pub holder_top10_max_pct: f64,
    pub stop_pct: f64,
    pub time_cap_sec: u64,
    /// Exit once price is this fraction above entry. Off when `None`.
    pub take_profit_pct: Option<f64>,
    pub random_entry_prob: f64,
    pub seed: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: StrategyKind::MomentumBreakout,
            ret3m_threshold: 0.012,
            vol_impulse_threshold: 2.0,
            breakout_lookback_min: 20.0,
            min_liquidity_usd: 50_000.0,
            max_spread_pct: 1.0,
            holder_top10_max_pct: 65.0,
            stop_pct: 0.05,
            time_cap_sec: 900,
            take_profit_pct: None,
            random_entry_prob: 0.2,
            seed: 7,
        }
    }
}

impl StrategyConfig {
    pub fn order_template(&self) -> OrderTemplate {
        OrderTemplate {
            stop_pct: self.stop_pct,
            time_cap_sec: self.time_cap_sec,
        }
    }
}

/// Builds the configured strategy.
pub fn from_config(cfg: &StrategyConfig) -> Box<dyn Strategy> {
    match cfg.kind {
        StrategyKind::MomentumBreakout => Box::new(MomentumBreakout::new(cfg.clone())),
        StrategyKind::Threshold => Box::new(ThresholdMomentum::new(cfg.ret3m_threshold, cfg.order_template())),
        StrategyKind::RandomBaseline => Box::new(RandomBaseline::new(
            cfg.random_entry_prob,
            cfg.seed,
            cfg.order_template(),
        )),
    }
}
