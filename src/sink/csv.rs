//! CSV files with a fixed header, created on first use.

use super::{SummarySink, TradeSink};
use crate::types::{InstrumentSummary, TradeRecord};
use anyhow::Context;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub const TRADE_LOG_HEADER: [&str; 6] = ["timestamp", "instrument", "price", "side", "pnl_usd", "equity_usd"];
pub const SUMMARY_HEADER: [&str; 5] = ["instrument", "symbol", "total_trades", "avg_pnl_usd", "total_pnl_usd"];

struct AppendFile {
    path: PathBuf,
    out: Mutex<csv::Writer<File>>,
}

impl AppendFile {
    fn open(path: &Path, header: &[&str]) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let fresh = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open {}", path.display()))?;
        let out = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        let this = Self {
            path: path.to_path_buf(),
            out: Mutex::new(out),
        };
        if fresh {
            this.append(header).with_context(|| format!("write header to {}", path.display()))?;
        }
        Ok(this)
    }

    fn append<I, T>(&self, record: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut out = self.out.lock();
        out.write_record(record)
            .with_context(|| format!("append to {}", self.path.display()))?;
        out.flush().context("flush")?;
        Ok(())
    }
}

pub struct CsvTradeLog {
    out: AppendFile,
}

impl CsvTradeLog {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self {
            out: AppendFile::open(path.as_ref(), &TRADE_LOG_HEADER)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.out.path
    }
}

impl TradeSink for CsvTradeLog {
    fn record(&self, t: &TradeRecord) -> anyhow::Result<()> {
        self.out.append([
            t.ts.timestamp_millis().to_string(),
            t.instrument.to_string(),
            t.price.to_string(),
            t.side.to_string(),
            format!("{:.6}", t.pnl_usd),
            format!("{:.2}", t.equity_after),
        ])
    }
}

pub struct CsvSummaryLog {
    out: AppendFile,
}

impl CsvSummaryLog {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Ok(Self {
            out: AppendFile::open(path.as_ref(), &SUMMARY_HEADER)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.out.path
    }
}

impl SummarySink for CsvSummaryLog {
    fn record(&self, s: &InstrumentSummary) -> anyhow::Result<()> {
        self.out.append([
            s.instrument.to_string(),
            s.symbol.clone(),
            s.trade_count.to_string(),
            format!("{:.2}", s.avg_pnl_usd),
            format!("{:.2}", s.total_pnl_usd),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InstrumentId, Side};
    use chrono::{TimeZone, Utc};

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("scout-csv-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("out.csv")
    }

    #[test]
    fn header_written_once() {
        let path = scratch("trades");
        let rec = TradeRecord {
            ts: Utc.timestamp_millis_opt(1_714_564_800_000).unwrap(),
            instrument: InstrumentId::from("base:0xabc"),
            price: 1.25,
            side: Side::Sell,
            pnl_usd: 12.5,
            equity_after: 10_012.5,
        };
        CsvTradeLog::open(&path).unwrap().record(&rec).unwrap();
        CsvTradeLog::open(&path).unwrap().record(&rec).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], TRADE_LOG_HEADER.join(","));
        assert_eq!(lines[1], "1714564800000,base:0xabc,1.25,SELL,12.500000,10012.50");
    }

    #[test]
    fn summary_quotes_symbols_with_commas() {
        let path = scratch("summary");
        let log = CsvSummaryLog::open(&path).unwrap();
        log.record(&InstrumentSummary::from_pnls(
            InstrumentId::from("sim:1"),
            "A,B".to_string(),
            &[10.0, -4.0],
        ))
        .unwrap();
        let body = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(body.lines().nth(1), Some("sim:1,\"A,B\",2,3.00,6.00"));
    }

    #[test]
    fn carriage_returns_are_quoted_and_read_back() {
        let path = scratch("cr");
        let log = CsvSummaryLog::open(&path).unwrap();
        log.record(&InstrumentSummary::from_pnls(
            InstrumentId::from("sim:2"),
            "A\rB \"x\"".to_string(),
            &[],
        ))
        .unwrap();

        let mut rdr = csv::Reader::from_path(log.path()).unwrap();
        assert_eq!(rdr.headers().unwrap(), SUMMARY_HEADER.as_slice());
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][1], "A\rB \"x\"");
        assert_eq!(&rows[0][3], "0.00");
    }
}
