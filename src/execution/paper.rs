use super::{ClosedTrade, ExecutionVenue, Fill, Position};
use crate::types::Side;
use chrono::{DateTime, Utc};

/// Simulated fills with a per-side fee and an optional flat slippage haircut.
///
/// State machine: FLAT (no position) -> `buy` -> OPEN -> `close` -> FLAT.
#[derive(Clone, Debug)]
pub struct PaperExecutor {
    fee_bps_per_side: f64,
    slippage_bps: f64,
    open: Option<Position>,
}

impl PaperExecutor {
    pub fn new(fee_bps_per_side: f64) -> Self {
        Self {
            fee_bps_per_side,
            slippage_bps: 0.0,
            open: None,
        }
    }

    pub fn with_slippage_bps(mut self, slippage_bps: f64) -> Self {
        self.slippage_bps = slippage_bps;
        self
    }

    fn fee_on(&self, notional: f64) -> f64 {
        notional * self.fee_bps_per_side / 10_000.0
    }

    fn slipped(&self, price: f64, side: Side) -> f64 {
        let slip = self.slippage_bps / 10_000.0;
        match side {
            Side::Buy => price * (1.0 + slip),
            Side::Sell => price * (1.0 - slip),
        }
    }
}

impl ExecutionVenue for PaperExecutor {
    fn position(&self) -> Option<&Position> {
        self.open.as_ref()
    }

    fn buy(&mut self, price: f64, notional_usd: f64, stop_price: f64, ts: DateTime<Utc>) -> Option<Fill> {
        if let Some(open) = &self.open {
            tracing::warn!(entry_price = open.entry_price, "buy rejected: position already open");
            return None;
        }
        if !(price.is_finite() && price > 0.0 && notional_usd.is_finite() && notional_usd > 0.0) {
            tracing::warn!(price, notional_usd, "buy rejected: invalid price or notional");
            return None;
        }

        let fill_price = self.slipped(price, Side::Buy);
        let fee = self.fee_on(notional_usd);
        self.open = Some(Position {
            entry_price: fill_price,
            size_usd: notional_usd - fee,
            opened_at: ts,
            stop_price,
        });
        tracing::info!(price = fill_price, notional_usd, fee_usd = fee, stop_price, "BUY filled (paper)");

        Some(Fill {
            side: Side::Buy,
            ts,
            price: fill_price,
            notional_usd,
            fee_usd: fee,
        })
    }

    fn close(&mut self, price: f64, ts: DateTime<Utc>) -> Option<ClosedTrade> {
        let position = self.open.take()?;
        let fill_price = self.slipped(price, Side::Sell);
        let gross = position.size_usd * (fill_price / position.entry_price);
        let fee = self.fee_on(gross);
        let pnl_usd = position.size_usd * (fill_price / position.entry_price - 1.0) - fee;
        tracing::info!(price = fill_price, pnl_usd, fee_usd = fee, "SELL filled (paper)");

        Some(ClosedTrade {
            exit: Fill {
                side: Side::Sell,
                ts,
                price: fill_price,
                notional_usd: gross,
                fee_usd: fee,
            },
            position,
            pnl_usd,
        })
    }
}
