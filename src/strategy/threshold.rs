use super::{Decision, OrderTemplate, Strategy};
use crate::features::Snapshot;

/// Enters whenever the short-window return clears a fixed threshold.
#[derive(Clone, Debug)]
pub struct ThresholdMomentum {
    threshold: f64,
    order: OrderTemplate,
}

impl ThresholdMomentum {
    pub fn new(threshold: f64, order: OrderTemplate) -> Self {
        Self { threshold, order }
    }
}

impl Strategy for ThresholdMomentum {
    fn name(&self) -> &str {
        "threshold"
    }

    fn decide(&self, snap: &Snapshot) -> Decision {
        if snap.ret_short.is_finite() && snap.ret_short >= self.threshold {
            Decision::Enter(self.order)
        } else {
            Decision::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::hot_snapshot;

    #[test]
    fn fires_at_threshold() {
        let order = OrderTemplate {
            stop_pct: 0.03,
            time_cap_sec: 60,
        };
        let s = ThresholdMomentum::new(0.003, order);
        let mut snap = hot_snapshot();
        snap.ret_short = 0.003;
        assert_eq!(s.decide(&snap), Decision::Enter(order));
        snap.ret_short = 0.0029;
        assert_eq!(s.decide(&snap), Decision::Hold);
    }
}
