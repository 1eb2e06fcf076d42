//! Scan loop and rotation controller.
//!
//! [`Scout`] owns every piece of trading state: the tick history, the risk
//! ledger, the execution venue and the current watch session. The per-tick
//! cycle ([`Scout::on_tick`]) is synchronous; the async [`Scout::run`] loop
//! only suspends while waiting for the next tick or sleeping between cycles.

use crate::config::ScoutConfig;
use crate::execution::{ExecutionVenue, PaperExecutor, Position};
use crate::features::{saturating_secs, FeatureExtractor, History, Snapshot};
use crate::market::MarketDataSupplier;
use crate::metrics::Scoreboard;
use crate::risk::{RiskLedger, RiskState};
use crate::rotation::{RotationConfig, RotationPolicy, RotationReason, WatchSession};
use crate::sink::{NoopSink, SummarySink, TradeSink};
use crate::strategy::{self, Decision, OrderTemplate, Strategy};
use crate::types::{Candidate, InstrumentId, Side, Tick, TradeRecord};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// Dropped: no session, or the history rejected it.
    Ignored,
    Flat,
    Holding,
    Entered,
    Exited { pnl_usd: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExitReason {
    Stop,
    TimeCap,
    TakeProfit,
    Flatten,
}

impl ExitReason {
    fn as_str(self) -> &'static str {
        match self {
            ExitReason::Stop => "stop",
            ExitReason::TimeCap => "time_cap",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::Flatten => "flatten",
        }
    }
}

pub struct Scout {
    supplier: Arc<dyn MarketDataSupplier>,
    extractor: FeatureExtractor,
    history: History,
    ledger: RiskLedger,
    venue: Box<dyn ExecutionVenue>,
    strategy: Box<dyn Strategy>,
    trades: Arc<dyn TradeSink>,
    summaries: Arc<dyn SummarySink>,
    scoreboard: Scoreboard,
    rotation: RotationConfig,
    policy: RotationPolicy,
    take_profit_pct: Option<f64>,
    session: Option<WatchSession>,
    /// Instrument the open position was bought on.
    open_instrument: Option<InstrumentId>,
    exit_deadline: Option<DateTime<Utc>>,
}

impl Scout {
    /// Paper execution, the configured strategy, no-op sinks.
    pub fn new(cfg: &ScoutConfig, supplier: Arc<dyn MarketDataSupplier>) -> Self {
        let venue = PaperExecutor::new(cfg.risk.fee_bps_per_side).with_slippage_bps(cfg.risk.slippage_bps);
        let scoreboard = Scoreboard::new();
        scoreboard.set_equity_usd(cfg.risk.starting_equity_usd);
        Self {
            supplier,
            extractor: FeatureExtractor::new(cfg.feature_config()),
            history: History::new(cfg.rotation.history_capacity),
            ledger: RiskLedger::new(cfg.risk.clone()),
            venue: Box::new(venue),
            strategy: strategy::from_config(&cfg.strategy),
            trades: Arc::new(NoopSink),
            summaries: Arc::new(NoopSink),
            scoreboard,
            rotation: cfg.rotation.clone(),
            policy: cfg.rotation.policy(),
            take_profit_pct: cfg.strategy.take_profit_pct,
            session: None,
            open_instrument: None,
            exit_deadline: None,
        }
    }

    pub fn with_trade_sink(mut self, sink: Arc<dyn TradeSink>) -> Self {
        self.trades = sink;
        self
    }

    pub fn with_summary_sink(mut self, sink: Arc<dyn SummarySink>) -> Self {
        self.summaries = sink;
        self
    }

    pub fn with_strategy(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_venue(mut self, venue: Box<dyn ExecutionVenue>) -> Self {
        self.venue = venue;
        self
    }

    pub fn with_scoreboard(mut self, scoreboard: Scoreboard) -> Self {
        scoreboard.set_equity_usd(self.ledger.state().equity_usd);
        self.scoreboard = scoreboard;
        self
    }

    pub fn risk_state(&self) -> RiskState {
        self.ledger.state()
    }

    pub fn position(&self) -> Option<&Position> {
        self.venue.position()
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current_instrument(&self) -> Option<&InstrumentId> {
        self.session.as_ref().map(|s| &s.candidate.id)
    }

    /// Starts watching `candidate` with an empty history. A session still in
    /// progress is closed out first, at the last seen price.
    pub fn begin_session(&mut self, candidate: Candidate) {
        if self.venue.has_open() {
            match self.history.last().cloned() {
                Some(last) => {
                    tracing::warn!(price = last.price, "new session with a position open; closing at last price");
                    self.exit(last.price, last.ts, ExitReason::Flatten);
                }
                None => tracing::warn!("new session with a position open and no price to close it at"),
            }
        }
        if self.session.is_some() {
            self.finish_session(RotationReason::Superseded);
        }
        self.history.clear();
        tracing::info!(
            instrument = %candidate.id,
            symbol = %candidate.symbol,
            score = candidate.score,
            strategy = self.strategy.name(),
            "watching instrument"
        );
        self.scoreboard.on_session_start(&candidate.id);
        self.session = Some(WatchSession::new(candidate));
    }

    /// One synchronous cycle: update state from `tick`, then exit or enter.
    pub fn on_tick(&mut self, tick: Tick) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            tracing::warn!("tick received with no instrument selected");
            return TickOutcome::Ignored;
        };
        let ts = tick.ts;
        self.ledger.roll_day(ts);
        if !self.history.push(tick) {
            return TickOutcome::Ignored;
        }
        session.observe(ts);

        let Some(snap) = self.extractor.compute(&self.history) else {
            return TickOutcome::Ignored;
        };

        if let Some(position) = self.venue.position() {
            return match self.exit_reason(position, &snap) {
                Some(reason) => match self.exit(snap.price, snap.ts, reason) {
                    Some(pnl_usd) => TickOutcome::Exited { pnl_usd },
                    None => TickOutcome::Holding,
                },
                None => TickOutcome::Holding,
            };
        }

        match self.strategy.decide(&snap) {
            Decision::Hold => TickOutcome::Flat,
            Decision::Enter(order) => self.enter(&snap, order),
        }
    }

    fn exit_reason(&self, position: &Position, snap: &Snapshot) -> Option<ExitReason> {
        if snap.price <= position.stop_price {
            return Some(ExitReason::Stop);
        }
        if self.exit_deadline.is_some_and(|deadline| snap.ts >= deadline) {
            return Some(ExitReason::TimeCap);
        }
        if let Some(tp) = self.take_profit_pct {
            if snap.price >= position.entry_price * (1.0 + tp) {
                return Some(ExitReason::TakeProfit);
            }
        }
        None
    }

    fn enter(&mut self, snap: &Snapshot, order: OrderTemplate) -> TickOutcome {
        let Some(id) = self.current_instrument().cloned() else {
            tracing::warn!("entry signal with no instrument selected");
            return TickOutcome::Flat;
        };
        if !self.ledger.can_open(order.stop_pct) {
            tracing::debug!(price = snap.price, stop_pct = order.stop_pct, "entry signal gated by risk");
            return TickOutcome::Flat;
        }
        let notional = self.ledger.size_for(order.stop_pct);
        let stop_price = snap.price * (1.0 - order.stop_pct);
        let Some(fill) = self.venue.buy(snap.price, notional, stop_price, snap.ts) else {
            return TickOutcome::Flat;
        };
        self.ledger.on_open(order.stop_pct);
        self.exit_deadline = Some(
            snap.ts
                .checked_add_signed(saturating_secs(order.time_cap_sec))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
        self.open_instrument = Some(id.clone());
        self.scoreboard.on_entry(&id);
        tracing::info!(
            instrument = %id,
            price = fill.price,
            notional_usd = notional,
            stop_price,
            time_cap_sec = order.time_cap_sec,
            "entered"
        );
        self.record_trade(TradeRecord {
            ts: fill.ts,
            instrument: id,
            price: fill.price,
            side: Side::Buy,
            pnl_usd: 0.0,
            equity_after: self.ledger.state().equity_usd,
        });
        TickOutcome::Entered
    }

    fn exit(&mut self, price: f64, ts: DateTime<Utc>, reason: ExitReason) -> Option<f64> {
        let closed = self.venue.close(price, ts)?;
        self.exit_deadline = None;
        self.ledger.on_close(closed.pnl_usd);
        let equity = self.ledger.state().equity_usd;

        let id = match self.open_instrument.take().or_else(|| self.current_instrument().cloned()) {
            Some(id) => id,
            None => {
                tracing::warn!(pnl_usd = closed.pnl_usd, "closed a position with no instrument on record");
                InstrumentId::from("unknown")
            }
        };
        if let Some(session) = self.session.as_mut().filter(|s| s.candidate.id == id) {
            session.record_close(closed.pnl_usd);
        }
        self.scoreboard
            .on_close(&id, closed.pnl_usd, closed.holding_secs() as u64, equity);
        tracing::info!(
            instrument = %id,
            reason = reason.as_str(),
            price = closed.exit.price,
            pnl_usd = closed.pnl_usd,
            equity_usd = equity,
            holding_secs = closed.holding_secs(),
            "exited"
        );
        self.record_trade(TradeRecord {
            ts: closed.exit.ts,
            instrument: id,
            price: closed.exit.price,
            side: Side::Sell,
            pnl_usd: closed.pnl_usd,
            equity_after: equity,
        });
        Some(closed.pnl_usd)
    }

    fn record_trade(&self, record: TradeRecord) {
        if let Err(e) = self.trades.record(&record) {
            tracing::warn!(error = %e, instrument = %record.instrument, "trade sink failed");
        }
    }

    /// Scans, watches the best candidate until a rotation is due, and repeats
    /// until `shutdown` flips to `true`.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        tracing::info!(
            strategy = self.strategy.name(),
            equity_usd = self.ledger.state().equity_usd,
            "scout started"
        );
        loop {
            let supplier = self.supplier.clone();
            let scan = tokio::select! {
                biased;
                _ = cancelled(&mut shutdown) => break,
                scan = supplier.list_candidates() => scan,
            };
            match scan {
                Ok(candidates) => match pick_best(candidates) {
                    Some(best) => {
                        if self.watch(best, &mut shutdown).await == RotationReason::Shutdown {
                            break;
                        }
                    }
                    None => tracing::warn!("candidate scan returned no usable instruments"),
                },
                Err(e) => tracing::warn!(error = %e, "candidate scan failed"),
            }

            tokio::select! {
                biased;
                _ = cancelled(&mut shutdown) => break,
                _ = tokio::time::sleep(self.rotation.cycle_delay()) => {}
            }
        }
        let state = self.ledger.state();
        tracing::info!(
            equity_usd = state.equity_usd,
            daily_pnl_usd = state.daily_pnl_usd,
            "scout stopped"
        );
        Ok(())
    }

    async fn watch(&mut self, candidate: Candidate, shutdown: &mut watch::Receiver<bool>) -> RotationReason {
        let id = candidate.id.clone();
        let supplier = self.supplier.clone();
        let opened = tokio::select! {
            biased;
            _ = cancelled(shutdown) => return RotationReason::Shutdown,
            opened = supplier.stream_ticks(&id) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(instrument = %id, error = %e, "could not open tick stream");
                return RotationReason::StreamErrors;
            }
        };

        self.begin_session(candidate);
        let error_limit = self.rotation.max_consecutive_stream_errors;
        let reason = loop {
            let next = tokio::select! {
                biased;
                _ = cancelled(shutdown) => None,
                next = stream.recv() => Some(next),
            };
            let Some(next) = next else {
                break RotationReason::Shutdown;
            };
            match next {
                None => break RotationReason::StreamExhausted,
                Some(Ok(tick)) => {
                    self.on_tick(tick);
                    if let Some(reason) = self.session.as_ref().and_then(|s| s.check(&self.policy)) {
                        break reason;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(instrument = %id, error = %e, "tick stream error");
                    if self.session.as_mut().is_some_and(|s| s.record_error(error_limit)) {
                        break RotationReason::StreamErrors;
                    }
                }
            }
        };
        drop(stream);
        self.end_session(reason).await;
        reason
    }

    /// Flattens any open position, flushes the summary and clears the history.
    pub async fn end_session(&mut self, reason: RotationReason) {
        if self.venue.has_open() {
            self.flatten().await;
        }
        self.finish_session(reason);
    }

    /// Flushes the summary and clears the history.
    fn finish_session(&mut self, reason: RotationReason) {
        if let Some(session) = self.session.take() {
            let summary = session.summary();
            tracing::info!(
                instrument = %summary.instrument,
                reason = %reason,
                watched_secs = session.elapsed().num_seconds(),
                trades = summary.trade_count,
                total_pnl_usd = summary.total_pnl_usd,
                "rotating away"
            );
            if let Err(e) = self.summaries.record(&summary) {
                tracing::warn!(error = %e, instrument = %summary.instrument, "summary sink failed");
            }
        }
        self.history.clear();
    }

    async fn flatten(&mut self) {
        let Some(last) = self.history.last().cloned() else {
            tracing::warn!("open position with no price history; cannot flatten");
            return;
        };
        let supplier = self.supplier.clone();
        let quote = match self.current_instrument().cloned() {
            Some(id) => match supplier.fetch_snapshot(&id).await {
                Ok(q) if q.is_well_formed() => Some(q),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(instrument = %id, error = %e, "quote for flatten failed; using last price");
                    None
                }
            },
            None => None,
        };
        let (price, ts) = match quote {
            Some(q) => (q.price, q.ts.max(last.ts)),
            None => (last.price, last.ts),
        };
        self.exit(price, ts, ExitReason::Flatten);
    }
}

/// Highest score wins; ties keep supplier order. Non-finite scores are skipped.
fn pick_best(candidates: Vec<Candidate>) -> Option<Candidate> {
    candidates
        .into_iter()
        .filter(|c| c.score.is_finite())
        .fold(None, |best: Option<Candidate>, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(c),
        })
}

/// Resolves once the shutdown flag is `true`. Never resolves if the sender is gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
