use hdrhistogram::Histogram;

#[derive(Clone, Debug)]
pub struct Histo {
    /// Integer samples (seconds for holding times).
    inner: Histogram<u64>,
}

impl Default for Histo {
    fn default() -> Self {
        Self {
            // 3 significant figures, auto-resizing; construction cannot fail
            inner: Histogram::new(3).unwrap_or_else(|_| unreachable!("sigfig 3 is valid")),
        }
    }
}

impl Histo {
    pub fn record(&mut self, v: u64) {
        let _ = self.inner.record(v.max(1));
    }

    pub fn p50(&self) -> u64 {
        self.inner.value_at_quantile(0.50)
    }

    pub fn p95(&self) -> u64 {
        self.inner.value_at_quantile(0.95)
    }

    pub fn max(&self) -> u64 {
        self.inner.max()
    }

    pub fn count(&self) -> u64 {
        self.inner.len()
    }
}

/// Running totals for one instrument, kept across rotations.
#[derive(Clone, Debug, Default)]
pub struct InstrumentStats {
    pub sessions: u64,
    pub entries: u64,
    pub closed: u64,
    pub wins: u64,
    pub total_pnl_usd: f64,
    pub best_pnl_usd: Option<f64>,
    pub worst_pnl_usd: Option<f64>,
    pub holding_secs: Histo,
}

impl InstrumentStats {
    pub fn record_close(&mut self, pnl_usd: f64, holding_secs: u64) {
        self.closed += 1;
        if pnl_usd > 0.0 {
            self.wins += 1;
        }
        self.total_pnl_usd += pnl_usd;
        self.best_pnl_usd = Some(self.best_pnl_usd.map_or(pnl_usd, |b| b.max(pnl_usd)));
        self.worst_pnl_usd = Some(self.worst_pnl_usd.map_or(pnl_usd, |w| w.min(pnl_usd)));
        self.holding_secs.record(holding_secs);
    }

    pub fn win_rate(&self) -> f64 {
        if self.closed == 0 {
            return 0.0;
        }
        self.wins as f64 / self.closed as f64
    }
}
