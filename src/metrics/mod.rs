//! Cross-instrument accumulator.
//!
//! The controller owns all trading state; the scoreboard is the one structure
//! meant to be read from elsewhere (the CLI prints it on exit), so it is
//! synchronized.

pub mod stats;

use crate::types::InstrumentId;
use dashmap::DashMap;
use parking_lot::Mutex;
use stats::InstrumentStats;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct Scoreboard {
    /// A per-instrument mutex keeps updates simple. Clones share the map.
    by_instrument: Arc<DashMap<InstrumentId, Arc<Mutex<InstrumentStats>>>>,
    equity_usd: Arc<Mutex<f64>>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn stats(&self, id: &InstrumentId) -> Arc<Mutex<InstrumentStats>> {
        self.by_instrument
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(InstrumentStats::default())))
            .clone()
    }

    pub fn on_session_start(&self, id: &InstrumentId) {
        self.stats(id).lock().sessions += 1;
    }

    pub fn on_entry(&self, id: &InstrumentId) {
        self.stats(id).lock().entries += 1;
    }

    pub fn on_close(&self, id: &InstrumentId, pnl_usd: f64, holding_secs: u64, equity_after: f64) {
        self.stats(id).lock().record_close(pnl_usd, holding_secs);
        *self.equity_usd.lock() = equity_after;
    }

    pub fn get(&self, id: &InstrumentId) -> Option<InstrumentStats> {
        self.by_instrument.get(id).map(|s| s.value().lock().clone())
    }

    pub fn set_equity_usd(&self, equity_usd: f64) {
        *self.equity_usd.lock() = equity_usd;
    }

    pub fn equity_usd(&self) -> f64 {
        *self.equity_usd.lock()
    }

    pub fn total_pnl_usd(&self) -> f64 {
        self.by_instrument
            .iter()
            .map(|s| s.value().lock().total_pnl_usd)
            .sum()
    }

    /// Flat, sorted key/value view for printing.
    pub fn snapshot_kv(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for entry in self.by_instrument.iter() {
            let id = entry.key();
            let s = entry.value().lock();
            out.insert(format!("sessions|{id}"), s.sessions.to_string());
            out.insert(format!("entries|{id}"), s.entries.to_string());
            out.insert(format!("closed|{id}"), s.closed.to_string());
            out.insert(format!("win_rate|{id}"), format!("{:.4}", s.win_rate()));
            out.insert(format!("pnl_usd|{id}"), format!("{:.2}", s.total_pnl_usd));
            if s.holding_secs.count() > 0 {
                out.insert(
                    format!("hold_secs|{id}"),
                    format!(
                        "p50={} p95={} max={}",
                        s.holding_secs.p50(),
                        s.holding_secs.p95(),
                        s.holding_secs.max()
                    ),
                );
            }
        }
        out.insert("equity_usd".to_string(), format!("{:.2}", self.equity_usd()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_across_sessions() {
        let board = Scoreboard::new();
        let id = InstrumentId::from("sim:0");
        board.on_session_start(&id);
        board.on_entry(&id);
        board.on_close(&id, 12.0, 120, 10_012.0);
        board.on_session_start(&id);
        board.on_entry(&id);
        board.on_close(&id, -4.0, 60, 10_008.0);

        let s = board.get(&id).unwrap();
        assert_eq!(s.sessions, 2);
        assert_eq!(s.closed, 2);
        assert_eq!(s.wins, 1);
        assert_eq!(s.best_pnl_usd, Some(12.0));
        assert_eq!(s.worst_pnl_usd, Some(-4.0));
        assert_eq!(board.total_pnl_usd(), 8.0);
        assert_eq!(board.equity_usd(), 10_008.0);

        let kv = board.snapshot_kv();
        assert_eq!(kv.get("win_rate|sim:0").map(String::as_str), Some("0.5000"));
        assert!(kv.contains_key("hold_secs|sim:0"));
    }
}
