use super::{Decision, OrderTemplate, Strategy};
use crate::features::Snapshot;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Coin-flip entries, ignoring the snapshot. A baseline for loop tests and
/// for comparing real strategies against chance.
pub struct RandomBaseline {
    prob: f64,
    order: OrderTemplate,
    rng: Mutex<StdRng>,
}

impl RandomBaseline {
    pub fn new(prob: f64, seed: u64, order: OrderTemplate) -> Self {
        Self {
            prob: prob.clamp(0.0, 1.0),
            order,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Strategy for RandomBaseline {
    fn name(&self) -> &str {
        "random-baseline"
    }

    fn decide(&self, _snap: &Snapshot) -> Decision {
        if self.rng.lock().gen_bool(self.prob) {
            Decision::Enter(self.order)
        } else {
            Decision::Hold
        }
    }
}
