//! Account equity, daily P&L and open-risk accounting.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Floor applied to the stop distance when sizing, so a zero stop yields a
/// large but finite notional.
pub const MIN_STOP_PCT: f64 = 0.0001;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RiskConfig {
    pub per_trade_risk_usd: f64,
    pub max_open_risk_pct: f64,
    pub daily_loss_cap_pct: f64,
    /// Flat adverse fill haircut applied by the paper executor.
    pub slippage_bps: f64,
    pub fee_bps_per_side: f64,
    pub starting_equity_usd: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            per_trade_risk_usd: 50.0,
            max_open_risk_pct: 2.0,
            daily_loss_cap_pct: 5.0,
            slippage_bps: 0.0,
            fee_bps_per_side: 30.0,
            starting_equity_usd: 10_000.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    pub equity_usd: f64,
    pub daily_pnl_usd: f64,
    pub open_risk_pct: f64,
}

#[derive(Clone, Debug)]
pub struct RiskLedger {
    cfg: RiskConfig,
    state: RiskState,
    /// Increment booked by the last `on_open`, released by the matching `on_close`.
    open_increment_pct: Option<f64>,
    trading_day: Option<NaiveDate>,
    day_start_equity_usd: f64,
    halted: bool,
}

impl RiskLedger {
    pub fn new(cfg: RiskConfig) -> Self {
        let equity = cfg.starting_equity_usd;
        Self {
            cfg,
            state: RiskState {
                equity_usd: equity,
                daily_pnl_usd: 0.0,
                open_risk_pct: 0.0,
            },
            open_increment_pct: None,
            trading_day: None,
            day_start_equity_usd: equity,
            halted: false,
        }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.cfg
    }

    pub fn state(&self) -> RiskState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Starts a new trading day (UTC date) when `now` crosses midnight.
    pub fn roll_day(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        match self.trading_day {
            Some(day) if day == today => {}
            Some(day) => {
                tracing::info!(
                    from = %day,
                    to = %today,
                    daily_pnl_usd = self.state.daily_pnl_usd,
                    "new trading day; resetting daily pnl"
                );
                self.trading_day = Some(today);
                self.state.daily_pnl_usd = 0.0;
                self.day_start_equity_usd = self.state.equity_usd;
                self.halted = false;
            }
            None => {
                self.trading_day = Some(today);
                self.day_start_equity_usd = self.state.equity_usd;
            }
        }
    }

    /// Notional that loses `per_trade_risk_usd` if the stop is hit.
    pub fn size_for(&self, stop_pct: f64) -> f64 {
        self.cfg.per_trade_risk_usd / stop_pct.max(MIN_STOP_PCT)
    }

    pub fn can_open(&mut self, stop_pct: f64) -> bool {
        if !stop_pct.is_finite() || stop_pct < 0.0 {
            return false;
        }
        if self.check_loss_cap() {
            return false;
        }
        if self.state.equity_usd <= 0.0 {
            return false;
        }
        self.state.open_risk_pct + self.risk_increment_pct() <= self.cfg.max_open_risk_pct
    }

    pub fn on_open(&mut self, _stop_pct: f64) {
        if self.open_increment_pct.is_some() {
            tracing::warn!("on_open called with a position already booked; ignoring");
            return;
        }
        let inc = self.risk_increment_pct();
        self.state.open_risk_pct += inc;
        self.open_increment_pct = Some(inc);
    }

    pub fn on_close(&mut self, pnl_usd: f64) {
        let Some(inc) = self.open_increment_pct.take() else {
            tracing::warn!(pnl_usd, "on_close without a matching on_open; ignoring");
            return;
        };
        self.state.daily_pnl_usd += pnl_usd;
        self.state.equity_usd += pnl_usd;
        self.state.open_risk_pct = (self.state.open_risk_pct - inc).max(0.0);
        self.check_loss_cap();
    }

    fn risk_increment_pct(&self) -> f64 {
        if self.state.equity_usd <= 0.0 {
            return f64::INFINITY;
        }
        self.cfg.per_trade_risk_usd / self.state.equity_usd * 100.0
    }

    /// Latches the halt for the rest of the day once the cap is breached.
    fn check_loss_cap(&mut self) -> bool {
        if self.halted {
            return true;
        }
        let cap_usd = self.cfg.daily_loss_cap_pct / 100.0 * self.day_start_equity_usd;
        if self.state.daily_pnl_usd < -cap_usd {
            tracing::warn!(
                daily_pnl_usd = self.state.daily_pnl_usd,
                cap_usd,
                "daily loss cap breached; no new positions until the next trading day"
            );
            self.halted = true;
        }
        self.halted
    }
}
