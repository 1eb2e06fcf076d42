use chrono::{DateTime, Duration, TimeZone, Utc};
use momentum_scout_bot::market::ReplaySupplier;
use momentum_scout_bot::sink::MemorySink;
use momentum_scout_bot::types::{Candidate, InstrumentId, Side, Tick};
use momentum_scout_bot::{Scout, ScoutConfig, TickOutcome};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn tick(min: i64, price: f64, volume: f64) -> Tick {
    Tick::new(t0() + Duration::minutes(min), price, volume)
}

/// Thirty quiet minutes, a one-minute burst on heavy volume, then a drift
/// that stays above the stop.
fn burst_feed() -> Vec<Tick> {
    let mut ticks: Vec<Tick> = (0..30).map(|m| tick(m, 1.0, 100.0)).collect();
    ticks.push(tick(30, 1.02, 1_000.0));
    ticks.extend((31..=50).map(|m| tick(m, 1.03, 100.0)));
    ticks
}

#[test]
fn single_burst_gives_one_round_trip_within_time_cap() {
    let cfg = ScoutConfig::default();
    let sink = MemorySink::new();
    let mut scout = Scout::new(&cfg, Arc::new(ReplaySupplier::new()))
        .with_trade_sink(Arc::new(sink.clone()))
        .with_summary_sink(Arc::new(sink.clone()));
    let id = InstrumentId::from("base:0xburst");
    scout.begin_session(Candidate {
        id: id.clone(),
        symbol: "BURST/WETH".to_string(),
        score: 10.0,
    });

    let outcomes: Vec<TickOutcome> = burst_feed().into_iter().map(|t| scout.on_tick(t)).collect();
    assert_eq!(outcomes[30], TickOutcome::Entered);
    assert!(matches!(outcomes[45], TickOutcome::Exited { .. }));
    assert_eq!(outcomes.iter().filter(|o| **o == TickOutcome::Entered).count(), 1);

    let trades = sink.trades();
    let sides: Vec<Side> = trades.iter().map(|t| t.side).collect();
    assert_eq!(sides, vec![Side::Buy, Side::Sell]);

    let (buy, sell) = (&trades[0], &trades[1]);
    assert_eq!(buy.instrument, id);
    assert_eq!(buy.price, 1.02);
    assert_eq!(buy.pnl_usd, 0.0);
    assert_eq!(buy.equity_after, 10_000.0);
    assert!(sell.ts - buy.ts <= Duration::seconds(cfg.strategy.time_cap_sec as i64));

    let expected = 997.0 * (1.03 / 1.02 - 1.0) - 997.0 * (1.03 / 1.02) * 0.003;
    assert!((sell.pnl_usd - expected).abs() < 1e-9);
    assert!((sell.equity_after - (10_000.0 + expected)).abs() < 1e-9);
    assert_eq!(scout.risk_state().equity_usd, sell.equity_after);
    assert!(scout.position().is_none());

    let stats = scout.scoreboard().get(&id).unwrap();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.closed, 1);
    assert_eq!(stats.wins, 1);
}

#[test]
fn quiet_feed_never_trades() {
    let sink = MemorySink::new();
    let mut scout = Scout::new(&ScoutConfig::default(), Arc::new(ReplaySupplier::new()))
        .with_trade_sink(Arc::new(sink.clone()));
    scout.begin_session(Candidate {
        id: InstrumentId::from("quiet"),
        symbol: "QUIET".to_string(),
        score: 1.0,
    });
    for m in 0..60 {
        assert_eq!(scout.on_tick(tick(m, 1.0, 100.0)), TickOutcome::Flat);
    }
    assert!(sink.trades().is_empty());
    assert_eq!(scout.risk_state().equity_usd, 10_000.0);
}
