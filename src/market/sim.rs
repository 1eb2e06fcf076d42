//! Synthetic market: a seeded random walk with occasional upward bursts, so
//! the loop has something to trade without network access.

use super::{MarketDataSupplier, TickStream, TICK_CHANNEL_CAPACITY};
use crate::error::SupplierError;
use crate::types::{Candidate, InstrumentId, Tick};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimConfig {
    pub seed: u64,
    pub instruments: usize,
    pub start_price: f64,
    /// Spacing of the virtual tick timestamps.
    pub tick_spacing_ms: u64,
    /// Sleep this long between ticks; 0 replays as fast as the consumer reads.
    pub pace_ms: u64,
    pub burst_prob: f64,
    pub max_burst: f64,
    pub noise: f64,
    pub liquidity_usd: f64,
    /// Ticks per stream; unbounded when `None`.
    pub max_ticks: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            instruments: 5,
            start_price: 1.0,
            tick_spacing_ms: 5_000,
            pace_ms: 0,
            burst_prob: 0.02,
            max_burst: 0.05,
            noise: 0.004,
            liquidity_usd: 120_000.0,
            max_ticks: None,
        }
    }
}

pub struct SimSupplier {
    cfg: SimConfig,
    rng: Mutex<StdRng>,
    last: Arc<DashMap<InstrumentId, Tick>>,
}

impl SimSupplier {
    pub fn new(cfg: SimConfig) -> Self {
        let rng = StdRng::seed_from_u64(cfg.seed);
        Self {
            cfg,
            rng: Mutex::new(rng),
            last: Arc::new(DashMap::new()),
        }
    }
}

/// One random-walk step: noise plus an occasional burst, floored at 0.01.
fn step(rng: &mut StdRng, cfg: &SimConfig, price: f64) -> f64 {
    let burst = if rng.gen_bool(cfg.burst_prob.clamp(0.0, 1.0)) {
        rng.gen::<f64>() * cfg.max_burst
    } else {
        0.0
    };
    let noise = (rng.gen::<f64>() - 0.5) * cfg.noise;
    (price * (1.0 + burst + noise)).max(0.01)
}

#[async_trait]
impl MarketDataSupplier for SimSupplier {
    async fn list_candidates(&self) -> Result<Vec<Candidate>, SupplierError> {
        if self.cfg.instruments == 0 {
            return Err(SupplierError::Empty);
        }
        let mut rng = self.rng.lock();
        let mut out: Vec<Candidate> = (0..self.cfg.instruments)
            .map(|i| Candidate {
                id: InstrumentId(format!("sim:{i}")),
                symbol: format!("SIM{i}/USD"),
                score: rng.gen_range(0.0..100.0),
            })
            .collect();
        out.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(out)
    }

    async fn stream_ticks(&self, id: &InstrumentId) -> Result<TickStream, SupplierError> {
        let cfg = self.cfg.clone();
        let seed = self.rng.lock().gen::<u64>();
        let last = self.last.clone();
        let id = id.clone();
        let start_price = last.get(&id).map(|t| t.price).unwrap_or(cfg.start_price);

        Ok(TickStream::spawn(TICK_CHANNEL_CAPACITY, move |tx| async move {
            let mut rng = StdRng::seed_from_u64(seed);
            let start = Utc::now();
            let mut price = start_price;
            let mut i: u64 = 0;
            while cfg.max_ticks.map_or(true, |max| i < max) {
                price = step(&mut rng, &cfg, price);
                let ts = start + ChronoDuration::milliseconds((i * cfg.tick_spacing_ms) as i64);
                let volume = 100.0 + rng.gen::<f64>() * 500.0;
                let tick = Tick::new(ts, price, volume).with_liquidity(cfg.liquidity_usd);
                last.insert(id.clone(), tick.clone());
                if tx.send(Ok(tick)).await.is_err() {
                    break;
                }
                i += 1;
                if cfg.pace_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(cfg.pace_ms)).await;
                }
            }
        }))
    }

    async fn fetch_snapshot(&self, id: &InstrumentId) -> Result<Tick, SupplierError> {
        self.last
            .get(id)
            .map(|t| t.value().clone())
            .ok_or(SupplierError::Empty)
    }
}
