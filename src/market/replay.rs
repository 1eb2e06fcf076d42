use super::{MarketDataSupplier, TickResult, TickStream};
use crate::error::SupplierError;
use crate::types::{Candidate, InstrumentId, Tick};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Scripted supplier for tests and offline replays.
///
/// Each instrument has one recorded feed. A candidate is offered until its
/// feed has been taken; once every feed is consumed the scan comes back
/// empty.
#[derive(Default)]
pub struct ReplaySupplier {
    candidates: Vec<Candidate>,
    scripts: Mutex<HashMap<InstrumentId, Vec<TickResult>>>,
    quotes: Mutex<HashMap<InstrumentId, Tick>>,
}

impl ReplaySupplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, candidate: Candidate, feed: Vec<TickResult>) -> Self {
        self.scripts.get_mut().insert(candidate.id.clone(), feed);
        self.candidates.push(candidate);
        self
    }

    pub fn with_quote(self, id: InstrumentId, tick: Tick) -> Self {
        self.quotes.lock().insert(id, tick);
        self
    }
}

#[async_trait]
impl MarketDataSupplier for ReplaySupplier {
    async fn list_candidates(&self) -> Result<Vec<Candidate>, SupplierError> {
        let scripts = self.scripts.lock();
        let mut out: Vec<Candidate> = self
            .candidates
            .iter()
            .filter(|c| scripts.contains_key(&c.id))
            .cloned()
            .collect();
        if out.is_empty() {
            return Err(SupplierError::Empty);
        }
        out.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(out)
    }

    async fn stream_ticks(&self, id: &InstrumentId) -> Result<TickStream, SupplierError> {
        let feed = self
            .scripts
            .lock()
            .remove(id)
            .ok_or_else(|| SupplierError::StreamTaken(id.to_string()))?;
        Ok(TickStream::from_items(feed))
    }

    async fn fetch_snapshot(&self, id: &InstrumentId) -> Result<Tick, SupplierError> {
        self.quotes.lock().get(id).cloned().ok_or(SupplierError::Empty)
    }
}
