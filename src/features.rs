//! Feature extraction from a bounded tick history.
//!
//! Every window is measured backwards from the newest tick's timestamp, and
//! every scan is bounded by the history capacity.

use crate::types::Tick;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Stand-ins for order-book data the tick feed does not carry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MicrostructureDefaults {
    pub liquidity_usd: f64,
    /// Percent, e.g. 0.5 = 0.5%.
    pub spread_pct: f64,
    /// Percent of supply held by the top ten wallets.
    pub top10_holder_pct: f64,
}

impl Default for MicrostructureDefaults {
    fn default() -> Self {
        Self {
            liquidity_usd: 120_000.0,
            spread_pct: 0.5,
            top10_holder_pct: 50.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureConfig {
    pub short_return_window_sec: u64,
    pub impulse_short_window_sec: u64,
    pub impulse_long_window_sec: u64,
    /// Rolling-high lookback. Filled from the strategy's `breakoutLookbackMin`.
    #[serde(skip)]
    pub breakout_lookback_min: f64,
    pub microstructure: MicrostructureDefaults,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            short_return_window_sec: 180,
            impulse_short_window_sec: 180,
            impulse_long_window_sec: 3_600,
            breakout_lookback_min: 20.0,
            microstructure: MicrostructureDefaults::default(),
        }
    }
}

/// Time-ascending ring buffer of ticks for the instrument being watched.
#[derive(Clone, Debug)]
pub struct History {
    ticks: VecDeque<Tick>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ticks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `tick`, evicting the oldest entry beyond capacity.
    ///
    /// Returns `false` (and leaves the buffer untouched) for malformed ticks
    /// and ticks older than the newest buffered one.
    pub fn push(&mut self, tick: Tick) -> bool {
        if !tick.is_well_formed() {
            tracing::warn!(price = tick.price, volume = tick.volume, "dropping malformed tick");
            return false;
        }
        if let Some(last) = self.ticks.back() {
            if tick.ts < last.ts {
                tracing::warn!(ts = %tick.ts, last = %last.ts, "dropping out-of-order tick");
                return false;
            }
        }
        if self.ticks.len() == self.capacity {
            self.ticks.pop_front();
        }
        self.ticks.push_back(tick);
        true
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&Tick> {
        self.ticks.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Tick> + '_ {
        self.ticks.iter()
    }

    /// Latest sample at or before `t`; the oldest sample if none precedes it.
    pub fn price_at(&self, t: DateTime<Utc>) -> Option<f64> {
        self.ticks
            .iter()
            .rev()
            .find(|tick| tick.ts <= t)
            .or_else(|| self.ticks.front())
            .map(|tick| tick.price)
    }

    /// Ticks with `ts >= since`, newest first.
    fn since(&self, since: DateTime<Utc>) -> impl Iterator<Item = &Tick> + '_ {
        self.ticks.iter().rev().take_while(move |tick| tick.ts >= since)
    }
}

/// Derived feature bundle for one instant. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub ts: DateTime<Utc>,
    pub price: f64,
    /// Fractional return over the short window (0.01 = +1%).
    pub ret_short: f64,
    pub vol_impulse: f64,
    pub rolling_high: f64,
    pub liquidity_usd: f64,
    pub spread_pct: f64,
    pub top10_holder_pct: f64,
}

impl Snapshot {
    pub fn is_finite(&self) -> bool {
        [
            self.price,
            self.ret_short,
            self.vol_impulse,
            self.rolling_high,
            self.liquidity_usd,
            self.spread_pct,
            self.top10_holder_pct,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

#[derive(Clone, Debug)]
pub struct FeatureExtractor {
    cfg: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(cfg: FeatureConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }

    /// Computes a snapshot as of the newest tick. `None` for an empty history.
    pub fn compute(&self, history: &History) -> Option<Snapshot> {
        let last = history.last()?;
        let now = last.ts;
        let price = last.price;

        let reference = history
            .price_at(window_start(now, saturating_secs(self.cfg.short_return_window_sec)))
            .unwrap_or(price);
        let ret_short = finite_or(fractional_change(reference, price), 0.0);

        let short_since = window_start(now, saturating_secs(self.cfg.impulse_short_window_sec));
        let long_since = window_start(now, saturating_secs(self.cfg.impulse_long_window_sec));
        let short_sum: f64 = history.since(short_since).map(|t| t.volume).sum();
        let long_vols: Vec<f64> = history.since(long_since).map(|t| t.volume).collect();
        let vol_impulse = finite_or(volume_impulse(short_sum, &long_vols), 1.0);

        let lookback = saturating_minutes(self.cfg.breakout_lookback_min);
        let rolling_high = history
            .since(window_start(now, lookback))
            .map(|t| t.price)
            .fold(price, f64::max);

        let micro = &self.cfg.microstructure;
        let liquidity_usd = last
            .liquidity_usd
            .filter(|l| l.is_finite() && *l >= 0.0)
            .unwrap_or(micro.liquidity_usd);

        Some(Snapshot {
            ts: now,
            price,
            ret_short,
            vol_impulse,
            rolling_high,
            liquidity_usd,
            spread_pct: micro.spread_pct,
            top10_holder_pct: micro.top10_holder_pct,
        })
    }
}

/// `s` seconds, clamped to the largest representable span.
pub(crate) fn saturating_secs(s: u64) -> Duration {
    i64::try_from(s)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Fractional minutes, clamped to the representable range. NaN is zero.
pub(crate) fn saturating_minutes(m: f64) -> Duration {
    // float-to-int `as` saturates at the i64 bounds
    let ms = (m * 60_000.0) as i64;
    Duration::try_milliseconds(ms).unwrap_or(if ms < 0 { Duration::MIN } else { Duration::MAX })
}

/// `now - window`, or the earliest representable instant when that underflows.
fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn fractional_change(from: f64, to: f64) -> f64 {
    if from <= 0.0 {
        return 0.0;
    }
    (to - from) / from
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

/// Short-window volume over the long-window median. 1 when there is no
/// baseline to compare against.
pub fn volume_impulse(short_sum: f64, long_window: &[f64]) -> f64 {
    let Some(baseline) = median(long_window) else {
        return 1.0;
    };
    if baseline <= 0.0 {
        return 1.0;
    }
    short_sum / baseline
}

/// Element at `len / 2` of the sorted input (upper midpoint on even lengths).
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn tick(sec: i64, price: f64, volume: f64) -> Tick {
        Tick::new(t0() + Duration::seconds(sec), price, volume)
    }

    fn history_of(ticks: &[Tick]) -> History {
        let mut h = History::new(240);
        for t in ticks {
            assert!(h.push(t.clone()));
        }
        h
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut h = History::new(3);
        for i in 0..5 {
            h.push(tick(i, 1.0 + i as f64, 1.0));
        }
        assert_eq!(h.len(), 3);
        let prices: Vec<f64> = h.iter().map(|t| t.price).collect();
        assert_eq!(prices, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn rejects_out_of_order_and_malformed_ticks() {
        let mut h = History::new(10);
        assert!(h.push(tick(10, 1.0, 1.0)));
        assert!(!h.push(tick(5, 1.0, 1.0)));
        assert!(!h.push(tick(11, 0.0, 1.0)));
        assert!(!h.push(tick(11, f64::NAN, 1.0)));
        assert!(!h.push(tick(11, 1.0, -1.0)));
        assert!(h.push(tick(10, 1.1, 1.0)));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn price_at_falls_back_to_oldest() {
        let h = history_of(&[tick(0, 2.0, 1.0), tick(60, 3.0, 1.0)]);
        assert_eq!(h.price_at(t0() - Duration::seconds(100)), Some(2.0));
        assert_eq!(h.price_at(t0() + Duration::seconds(59)), Some(2.0));
        assert_eq!(h.price_at(t0() + Duration::seconds(60)), Some(3.0));
    }

    #[test]
    fn short_return_uses_sample_at_window_start() {
        // 1 tick per minute, price rises 1% per minute from 100.
        let ticks: Vec<Tick> = (0..10)
            .map(|i| tick(i * 60, 100.0 * 1.01f64.powi(i as i32), 1.0))
            .collect();
        let snap = FeatureExtractor::new(FeatureConfig::default())
            .compute(&history_of(&ticks))
            .unwrap();
        // now = 540s, window start = 360s -> sample at i = 6.
        let expected = 1.01f64.powi(9) / 1.01f64.powi(6) - 1.0;
        assert!((snap.ret_short - expected).abs() < 1e-12);
    }

    #[test]
    fn single_tick_history_is_finite() {
        let snap = FeatureExtractor::new(FeatureConfig::default())
            .compute(&history_of(&[tick(0, 0.5, 0.0)]))
            .unwrap();
        assert!(snap.is_finite());
        assert_eq!(snap.ret_short, 0.0);
        assert_eq!(snap.vol_impulse, 1.0);
        assert_eq!(snap.rolling_high, 0.5);
    }

    #[test]
    fn empty_history_has_no_snapshot() {
        let ex = FeatureExtractor::new(FeatureConfig::default());
        assert!(ex.compute(&History::new(10)).is_none());
    }

    #[test]
    fn impulse_is_one_without_baseline() {
        assert_eq!(volume_impulse(0.0, &[]), 1.0);
        assert_eq!(volume_impulse(500.0, &[]), 1.0);
        assert_eq!(volume_impulse(500.0, &[0.0, 0.0, 0.0]), 1.0);
    }

    #[test]
    fn median_takes_upper_midpoint() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(3.0));
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn impulse_compares_short_sum_to_long_median() {
        // 60 quiet minutes at volume 10, then three loud ticks in the last 3 min.
        let mut ticks: Vec<Tick> = (0..60).map(|i| tick(i * 60, 1.0, 10.0)).collect();
        ticks.push(tick(3_600 + 60, 1.0, 100.0));
        ticks.push(tick(3_600 + 120, 1.0, 100.0));
        ticks.push(tick(3_600 + 180, 1.0, 100.0));
        let snap = FeatureExtractor::new(FeatureConfig::default())
            .compute(&history_of(&ticks))
            .unwrap();
        // short window starts at 3600s: only the three loud ticks. Long median is 10.
        assert!((snap.vol_impulse - 300.0 / 10.0).abs() < 1e-12);
    }

    #[test]
    fn rolling_high_respects_lookback() {
        let ticks = vec![
            tick(0, 50.0, 1.0),
            tick(25 * 60, 10.0, 1.0),
            tick(30 * 60, 12.0, 1.0),
            tick(31 * 60, 11.0, 1.0),
        ];
        let snap = FeatureExtractor::new(FeatureConfig::default())
            .compute(&history_of(&ticks))
            .unwrap();
        assert_eq!(snap.rolling_high, 12.0);
    }

    #[test]
    fn huge_windows_do_not_overflow() {
        let cfg = FeatureConfig {
            short_return_window_sec: u64::MAX,
            impulse_short_window_sec: 10_000_000_000_000,
            impulse_long_window_sec: u64::MAX,
            breakout_lookback_min: 1e300,
            ..FeatureConfig::default()
        };
        let h = history_of(&[tick(0, 2.0, 10.0), tick(60, 3.0, 10.0)]);
        let snap = FeatureExtractor::new(cfg).compute(&h).unwrap();
        assert!(snap.is_finite());
        assert_eq!(snap.ret_short, 0.5);
        assert_eq!(snap.vol_impulse, 2.0);
        assert_eq!(snap.rolling_high, 3.0);
    }

    #[test]
    fn tick_liquidity_overrides_default() {
        let h = history_of(&[tick(0, 1.0, 1.0).with_liquidity(7_500.0)]);
        let snap = FeatureExtractor::new(FeatureConfig::default()).compute(&h).unwrap();
        assert_eq!(snap.liquidity_usd, 7_500.0);
        assert_eq!(snap.spread_pct, 0.5);
    }
}
