//! Top-level configuration, loaded from JSON. Every key is optional.

use crate::error::ConfigError;
use crate::features::FeatureConfig;
use crate::market::SupplierConfig;
use crate::risk::RiskConfig;
use crate::rotation::RotationConfig;
use crate::strategy::StrategyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Upper bound for every time window, lookback and cap (30 days).
pub const MAX_WINDOW_SEC: u64 = 30 * 24 * 60 * 60;

/// Upper bound for the pause between cycles (1 day).
pub const MAX_CYCLE_DELAY_SEC: f64 = 24.0 * 60.0 * 60.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SinkConfig {
    pub trade_log_path: PathBuf,
    pub summary_path: PathBuf,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            trade_log_path: PathBuf::from("trade_log.csv"),
            summary_path: PathBuf::from("summary_by_coin.csv"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoutConfig {
    pub risk: RiskConfig,
    pub strategy: StrategyConfig,
    pub rotation: RotationConfig,
    pub features: FeatureConfig,
    pub supplier: SupplierConfig,
    pub sinks: SinkConfig,
}

impl ScoutConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let risk = &self.risk;
        check_non_negative("risk.perTradeRiskUsd", risk.per_trade_risk_usd)?;
        check_non_negative("risk.maxOpenRiskPct", risk.max_open_risk_pct)?;
        check_non_negative("risk.dailyLossCapPct", risk.daily_loss_cap_pct)?;
        check_non_negative("risk.slippageBps", risk.slippage_bps)?;
        check_non_negative("risk.feeBpsPerSide", risk.fee_bps_per_side)?;
        if !(risk.starting_equity_usd.is_finite() && risk.starting_equity_usd > 0.0) {
            return Err(invalid("risk.startingEquityUsd must be positive"));
        }

        let s = &self.strategy;
        if !(s.stop_pct.is_finite() && (0.0..1.0).contains(&s.stop_pct)) {
            return Err(invalid("strategy.stopPct must be in [0, 1)"));
        }
        if !(s.random_entry_prob.is_finite() && (0.0..=1.0).contains(&s.random_entry_prob)) {
            return Err(invalid("strategy.randomEntryProb must be in [0, 1]"));
        }
        if let Some(tp) = s.take_profit_pct {
            if !(tp.is_finite() && tp > 0.0) {
                return Err(invalid("strategy.takeProfitPct must be positive"));
            }
        }
        check_minutes("strategy.breakoutLookbackMin", s.breakout_lookback_min)?;
        check_window("strategy.timeCapSec", s.time_cap_sec)?;

        let r = &self.rotation;
        check_minutes("rotation.minWatchMin", r.min_watch_min)?;
        check_minutes("rotation.maxWatchMin", r.max_watch_min)?;
        check_minutes("rotation.scanIntervalMin", r.scan_interval_min)?;
        check_non_negative("rotation.cycleDelaySec", r.cycle_delay_sec)?;
        if r.cycle_delay_sec > MAX_CYCLE_DELAY_SEC {
            return Err(invalid("rotation.cycleDelaySec must be at most one day"));
        }
        if r.max_watch_min < r.min_watch_min {
            return Err(invalid("rotation.maxWatchMin must be >= minWatchMin"));
        }
        if r.history_capacity == 0 {
            return Err(invalid("rotation.historyCapacity must be > 0"));
        }
        if r.max_consecutive_stream_errors == 0 {
            return Err(invalid("rotation.maxConsecutiveStreamErrors must be > 0"));
        }

        let f = &self.features;
        check_window("features.shortReturnWindowSec", f.short_return_window_sec)?;
        check_window("features.impulseShortWindowSec", f.impulse_short_window_sec)?;
        check_window("features.impulseLongWindowSec", f.impulse_long_window_sec)?;
        if f.impulse_long_window_sec < f.impulse_short_window_sec {
            return Err(invalid("features.impulseLongWindowSec must be >= impulseShortWindowSec"));
        }
        Ok(())
    }

    /// Feature settings with the rolling-high lookback taken from the strategy.
    pub fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            breakout_lookback_min: self.strategy.breakout_lookback_min,
            ..self.features.clone()
        }
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}

fn check_non_negative(key: &str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{key} must be a non-negative number")))
    }
}

fn check_window(key: &str, secs: u64) -> Result<(), ConfigError> {
    if secs <= MAX_WINDOW_SEC {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{key} must be at most {MAX_WINDOW_SEC} seconds")))
    }
}

fn check_minutes(key: &str, min: f64) -> Result<(), ConfigError> {
    check_non_negative(key, min)?;
    if min * 60.0 <= MAX_WINDOW_SEC as f64 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{key} must be at most {} minutes", MAX_WINDOW_SEC / 60)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::SupplierKind;
    use crate::strategy::StrategyKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg = ScoutConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, ScoutConfig::default());
        assert_eq!(cfg.risk.fee_bps_per_side, 30.0);
        assert_eq!(cfg.rotation.history_capacity, 240);
        assert_eq!(cfg.sinks.summary_path, PathBuf::from("summary_by_coin.csv"));
    }

    #[test]
    fn camel_case_keys_override() {
        let cfg = ScoutConfig::from_json_str(
            r#"{
                "risk": { "perTradeRiskUsd": 25, "feeBpsPerSide": 10 },
                "strategy": { "kind": "randomBaseline", "ret3mThreshold": 0.02, "holderTop10MaxPct": 40, "breakoutLookbackMin": 30 },
                "rotation": { "minWatchMin": 5, "maxWatchMin": 10 },
                "supplier": { "kind": "dexScreener" }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.risk.per_trade_risk_usd, 25.0);
        assert_eq!(cfg.risk.daily_loss_cap_pct, 5.0);
        assert_eq!(cfg.strategy.kind, StrategyKind::RandomBaseline);
        assert_eq!(cfg.strategy.ret3m_threshold, 0.02);
        assert_eq!(cfg.strategy.holder_top10_max_pct, 40.0);
        assert_eq!(cfg.rotation.max_watch_min, 10.0);
        assert_eq!(cfg.supplier.kind, SupplierKind::DexScreener);
        assert_eq!(cfg.feature_config().breakout_lookback_min, 30.0);
    }

    #[test]
    fn rejects_inverted_watch_bounds() {
        let err = ScoutConfig::from_json_str(r#"{ "rotation": { "minWatchMin": 50, "maxWatchMin": 40 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_out_of_range_probabilities_and_stops() {
        assert!(ScoutConfig::from_json_str(r#"{ "strategy": { "stopPct": 1.5 } }"#).is_err());
        assert!(ScoutConfig::from_json_str(r#"{ "strategy": { "randomEntryProb": -0.1 } }"#).is_err());
        assert!(ScoutConfig::from_json_str(r#"{ "risk": { "feeBpsPerSide": -1 } }"#).is_err());
    }

    #[test]
    fn rejects_unrepresentable_durations() {
        for raw in [
            r#"{ "features": { "impulseLongWindowSec": 10000000000000 } }"#,
            r#"{ "features": { "shortReturnWindowSec": 18446744073709551615, "impulseLongWindowSec": 18446744073709551615 } }"#,
            r#"{ "features": { "impulseShortWindowSec": 2592001, "impulseLongWindowSec": 2592001 } }"#,
            r#"{ "strategy": { "timeCapSec": 10000000000000000 } }"#,
            r#"{ "strategy": { "timeCapSec": 18446744073709551615 } }"#,
            r#"{ "strategy": { "breakoutLookbackMin": 1e12 } }"#,
            r#"{ "rotation": { "cycleDelaySec": 1e300 } }"#,
            r#"{ "rotation": { "maxWatchMin": 1e300 } }"#,
        ] {
            assert!(
                matches!(ScoutConfig::from_json_str(raw), Err(ConfigError::Invalid(_))),
                "accepted {raw}"
            );
        }
        let edge = format!(r#"{{ "strategy": {{ "timeCapSec": {MAX_WINDOW_SEC} }} }}"#);
        assert!(ScoutConfig::from_json_str(&edge).is_ok());
    }

    #[test]
    fn parse_and_io_errors_are_distinct() {
        assert!(matches!(ScoutConfig::from_json_str("{"), Err(ConfigError::Parse(_))));
        assert!(matches!(
            ScoutConfig::from_json_file("/definitely/not/here.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
