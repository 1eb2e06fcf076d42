//! Momentum breakout: a sharp short-window move on elevated volume that prints
//! a fresh rolling high, in a pool that is deep, tight and not too concentrated.

use super::{Decision, Strategy, StrategyConfig};
use crate::features::Snapshot;

#[derive(Clone, Debug)]
pub struct MomentumBreakout {
    cfg: StrategyConfig,
}

impl MomentumBreakout {
    pub fn new(cfg: StrategyConfig) -> Self {
        Self { cfg }
    }

    fn passes_filters(&self, snap: &Snapshot) -> bool {
        snap.liquidity_usd >= self.cfg.min_liquidity_usd
            && snap.spread_pct <= self.cfg.max_spread_pct
            && snap.top10_holder_pct <= self.cfg.holder_top10_max_pct
    }

    fn has_momentum(&self, snap: &Snapshot) -> bool {
        snap.ret_short >= self.cfg.ret3m_threshold
            && snap.vol_impulse >= self.cfg.vol_impulse_threshold
            && snap.price >= snap.rolling_high
    }
}

impl Strategy for MomentumBreakout {
    fn name(&self) -> &str {
        "momentum-breakout"
    }

    fn decide(&self, snap: &Snapshot) -> Decision {
        if !snap.is_finite() {
            return Decision::Hold;
        }
        if self.passes_filters(snap) && self.has_momentum(snap) {
            Decision::Enter(self.cfg.order_template())
        } else {
            Decision::Hold
        }
    }
}
