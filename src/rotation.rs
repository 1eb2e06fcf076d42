//! When to leave the instrument being watched.

use crate::features::saturating_minutes;
use crate::types::{Candidate, InstrumentSummary};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RotationConfig {
    pub min_watch_min: f64,
    pub max_watch_min: f64,
    pub scan_interval_min: f64,
    pub history_capacity: usize,
    pub cycle_delay_sec: f64,
    pub max_consecutive_stream_errors: u32,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            min_watch_min: 20.0,
            max_watch_min: 40.0,
            scan_interval_min: 15.0,
            history_capacity: 240,
            cycle_delay_sec: 7.0,
            max_consecutive_stream_errors: 10,
        }
    }
}

impl RotationConfig {
    pub fn policy(&self) -> RotationPolicy {
        RotationPolicy {
            min_watch: saturating_minutes(self.min_watch_min),
            max_watch: saturating_minutes(self.max_watch_min),
            scan_interval: saturating_minutes(self.scan_interval_min),
        }
    }

    pub fn cycle_delay(&self) -> std::time::Duration {
        std::time::Duration::try_from_secs_f64(self.cycle_delay_sec.max(0.0)).unwrap_or(std::time::Duration::MAX)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RotationPolicy {
    pub min_watch: Duration,
    pub max_watch: Duration,
    pub scan_interval: Duration,
}

impl RotationPolicy {
    /// Switch only after the minimum watch, and then only when the rescan
    /// timer has fired or the maximum watch is exceeded.
    pub fn should_rotate(&self, elapsed: Duration, rescan_due: bool) -> bool {
        elapsed > self.min_watch && (rescan_due || elapsed > self.max_watch)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationReason {
    RescanDue,
    MaxWatchExceeded,
    StreamExhausted,
    StreamErrors,
    /// Another instrument was selected while this one was still being watched.
    Superseded,
    Shutdown,
}

impl fmt::Display for RotationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RotationReason::RescanDue => "rescan_due",
            RotationReason::MaxWatchExceeded => "max_watch_exceeded",
            RotationReason::StreamExhausted => "stream_exhausted",
            RotationReason::StreamErrors => "stream_errors",
            RotationReason::Superseded => "superseded",
            RotationReason::Shutdown => "shutdown",
        })
    }
}

/// Bookkeeping for one instrument, from selection to rotation.
#[derive(Clone, Debug)]
pub struct WatchSession {
    pub candidate: Candidate,
    started_at: Option<DateTime<Utc>>,
    last_seen: Option<DateTime<Utc>>,
    closed_pnls: Vec<f64>,
    consecutive_errors: u32,
}

impl WatchSession {
    pub fn new(candidate: Candidate) -> Self {
        Self {
            candidate,
            started_at: None,
            last_seen: None,
            closed_pnls: Vec::new(),
            consecutive_errors: 0,
        }
    }

    /// Advances the session clock. The first tick starts it.
    pub fn observe(&mut self, ts: DateTime<Utc>) {
        self.started_at.get_or_insert(ts);
        self.last_seen = Some(self.last_seen.map_or(ts, |l| l.max(ts)));
        self.consecutive_errors = 0;
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        match (self.started_at, self.last_seen) {
            (Some(start), Some(last)) => last - start,
            _ => Duration::zero(),
        }
    }

    /// Latches once `scan_interval` has passed since the first tick.
    pub fn rescan_due(&self, policy: &RotationPolicy) -> bool {
        self.started_at.is_some() && self.elapsed() >= policy.scan_interval
    }

    pub fn check(&self, policy: &RotationPolicy) -> Option<RotationReason> {
        let elapsed = self.elapsed();
        let rescan_due = self.rescan_due(policy);
        if !policy.should_rotate(elapsed, rescan_due) {
            return None;
        }
        Some(if rescan_due {
            RotationReason::RescanDue
        } else {
            RotationReason::MaxWatchExceeded
        })
    }

    /// Counts a stream error; `true` once `limit` errors arrived in a row.
    pub fn record_error(&mut self, limit: u32) -> bool {
        self.consecutive_errors += 1;
        self.consecutive_errors >= limit.max(1)
    }

    pub fn record_close(&mut self, pnl_usd: f64) {
        self.closed_pnls.push(pnl_usd);
    }

    pub fn trade_count(&self) -> usize {
        self.closed_pnls.len()
    }

    pub fn summary(&self) -> InstrumentSummary {
        InstrumentSummary::from_pnls(
            self.candidate.id.clone(),
            self.candidate.symbol.clone(),
            &self.closed_pnls,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InstrumentId;
    use chrono::TimeZone;

    fn policy() -> RotationPolicy {
        RotationConfig::default().policy()
    }

    fn session() -> WatchSession {
        WatchSession::new(Candidate {
            id: InstrumentId::from("sim:0"),
            symbol: "SIM0/USD".to_string(),
            score: 1.0,
        })
    }

    #[test]
    fn switches_after_min_watch_when_rescan_due() {
        assert!(policy().should_rotate(Duration::minutes(25), true));
    }

    #[test]
    fn holds_before_min_watch() {
        assert!(!policy().should_rotate(Duration::minutes(10), true));
        assert!(!policy().should_rotate(Duration::minutes(10), false));
    }

    #[test]
    fn max_watch_forces_switch_without_rescan() {
        assert!(!policy().should_rotate(Duration::minutes(30), false));
        assert!(policy().should_rotate(Duration::minutes(41), false));
    }

    #[test]
    fn session_clock_runs_on_tick_time() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut s = session();
        assert_eq!(s.elapsed(), Duration::zero());
        assert!(!s.rescan_due(&policy()));

        s.observe(t0);
        s.observe(t0 + Duration::minutes(16));
        assert!(s.rescan_due(&policy()));
        assert_eq!(s.check(&policy()), None);

        s.observe(t0 + Duration::minutes(21));
        assert_eq!(s.check(&policy()), Some(RotationReason::RescanDue));
    }

    #[test]
    fn out_of_range_settings_saturate() {
        let cfg = RotationConfig {
            min_watch_min: 1e300,
            max_watch_min: f64::INFINITY,
            cycle_delay_sec: 1e300,
            ..RotationConfig::default()
        };
        let p = cfg.policy();
        assert!(!p.should_rotate(Duration::days(365), true));
        assert_eq!(cfg.cycle_delay(), std::time::Duration::MAX);
    }

    #[test]
    fn consecutive_errors_reset_on_tick() {
        let mut s = session();
        assert!(!s.record_error(3));
        assert!(!s.record_error(3));
        s.observe(Utc::now());
        assert!(!s.record_error(3));
        assert!(!s.record_error(3));
        assert!(s.record_error(3));
    }

    #[test]
    fn summary_averages_closed_trades() {
        let mut s = session();
        assert_eq!(s.summary().avg_pnl_usd, 0.0);
        s.record_close(10.0);
        s.record_close(-2.0);
        let summary = s.summary();
        assert_eq!(summary.trade_count, 2);
        assert_eq!(summary.avg_pnl_usd, 4.0);
        assert_eq!(summary.symbol, "SIM0/USD");
    }
}
