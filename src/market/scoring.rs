//! Candidate ranking policies.
//!
//! Different scanners rank pairs differently (order-flow imbalance vs. volume
//! plus momentum), so the score is a swappable policy rather than one formula.

use serde::{Deserialize, Serialize};

/// Per-pair activity figures a scorer may use.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PairMetrics {
    pub price_usd: f64,
    pub buys_h1: u64,
    pub sells_h1: u64,
    pub volume_h1: f64,
    pub volume_h24: f64,
    /// Percent, as reported by the venue (1.5 = +1.5%).
    pub price_change_h1: f64,
    pub liquidity_usd: f64,
}

pub trait CandidateScorer: Send + Sync {
    fn score(&self, m: &PairMetrics) -> f64;
}

/// Net buy pressure plus a slow volume term, with a small penalty for dust
/// prices.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowImbalance {
    pub buy_weight: f64,
    pub volume_divisor: f64,
}

impl Default for FlowImbalance {
    fn default() -> Self {
        Self {
            buy_weight: 2.0,
            volume_divisor: 20_000.0,
        }
    }
}

impl CandidateScorer for FlowImbalance {
    fn score(&self, m: &PairMetrics) -> f64 {
        let imbalance = m.buys_h1 as f64 - m.sells_h1 as f64;
        let dust = if m.price_usd > 0.000_001 { 1.0 } else { -1.0 };
        imbalance * self.buy_weight + m.volume_h24 / self.volume_divisor + dust
    }
}

/// Log hourly volume plus a weighted hourly price change.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeMomentum {
    pub momentum_weight: f64,
}

impl Default for VolumeMomentum {
    fn default() -> Self {
        Self { momentum_weight: 0.5 }
    }
}

impl CandidateScorer for VolumeMomentum {
    fn score(&self, m: &PairMetrics) -> f64 {
        m.volume_h1.max(0.0).ln_1p() + self.momentum_weight * m.price_change_h1
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScorerKind {
    #[default]
    FlowImbalance,
    VolumeMomentum,
}

impl ScorerKind {
    pub fn build(self) -> Box<dyn CandidateScorer> {
        match self {
            ScorerKind::FlowImbalance => Box::new(FlowImbalance::default()),
            ScorerKind::VolumeMomentum => Box::new(VolumeMomentum::default()),
        }
    }
}
