use crate::types::{InstrumentSummary, TradeRecord};
use parking_lot::Mutex;
use std::sync::Arc;

pub mod csv;

pub use self::csv::{CsvSummaryLog, CsvTradeLog};

/// Append-only writer for fills.
pub trait TradeSink: Send + Sync {
    fn record(&self, trade: &TradeRecord) -> anyhow::Result<()>;
}

/// Append-only writer for per-instrument roll-ups.
pub trait SummarySink: Send + Sync {
    fn record(&self, summary: &InstrumentSummary) -> anyhow::Result<()>;
}

/// Drops everything.
#[derive(Clone, Debug, Default)]
pub struct NoopSink;

impl TradeSink for NoopSink {
    fn record(&self, _trade: &TradeRecord) -> anyhow::Result<()> {
        Ok(())
    }
}

impl SummarySink for NoopSink {
    fn record(&self, _summary: &InstrumentSummary) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Keeps records in memory; handy for tests and for inspecting a run.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    trades: Arc<Mutex<Vec<TradeRecord>>>,
    summaries: Arc<Mutex<Vec<InstrumentSummary>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trades(&self) -> Vec<TradeRecord> {
        self.trades.lock().clone()
    }

    pub fn summaries(&self) -> Vec<InstrumentSummary> {
        self.summaries.lock().clone()
    }
}

impl TradeSink for MemorySink {
    fn record(&self, trade: &TradeRecord) -> anyhow::Result<()> {
        self.trades.lock().push(trade.clone());
        Ok(())
    }
}

impl SummarySink for MemorySink {
    fn record(&self, summary: &InstrumentSummary) -> anyhow::Result<()> {
        self.summaries.lock().push(summary.clone());
        Ok(())
    }
}

/// Fan-out to several trade sinks. Stops at the first failure.
pub struct CompositeTradeSink {
    sinks: Vec<Arc<dyn TradeSink>>,
}

impl CompositeTradeSink {
    pub fn new(sinks: Vec<Arc<dyn TradeSink>>) -> Self {
        Self { sinks }
    }
}

impl TradeSink for CompositeTradeSink {
    fn record(&self, trade: &TradeRecord) -> anyhow::Result<()> {
        for sink in &self.sinks {
            sink.record(trade)?;
        }
        Ok(())
    }
}

/// Fan-out to several summary sinks. Stops at the first failure.
pub struct CompositeSummarySink {
    sinks: Vec<Arc<dyn SummarySink>>,
}

impl CompositeSummarySink {
    pub fn new(sinks: Vec<Arc<dyn SummarySink>>) -> Self {
        Self { sinks }
    }
}

impl SummarySink for CompositeSummarySink {
    fn record(&self, summary: &InstrumentSummary) -> anyhow::Result<()> {
        for sink in &self.sinks {
            sink.record(summary)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InstrumentId, Side};
    use chrono::Utc;

    #[test]
    fn composite_fans_out() {
        let a = MemorySink::new();
        let b = MemorySink::new();
        let sink = CompositeTradeSink::new(vec![Arc::new(a.clone()), Arc::new(b.clone()), Arc::new(NoopSink)]);
        let rec = TradeRecord {
            ts: Utc::now(),
            instrument: InstrumentId::from("x"),
            price: 1.0,
            side: Side::Buy,
            pnl_usd: 0.0,
            equity_after: 10_000.0,
        };
        sink.record(&rec).unwrap();
        assert_eq!(a.trades(), vec![rec.clone()]);
        assert_eq!(b.trades(), vec![rec]);
    }
}
