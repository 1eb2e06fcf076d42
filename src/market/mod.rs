//! Market data suppliers.
//!
//! The controller only sees [`MarketDataSupplier`]. Ticks arrive through a
//! [`TickStream`], a single-consumer bounded channel: when the consumer falls
//! behind, the producer blocks instead of buffering without limit.

use crate::error::SupplierError;
use crate::types::{Candidate, InstrumentId, Tick};
use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub mod dexscreener;
pub mod replay;
pub mod scoring;
pub mod sim;

pub use dexscreener::{DexScreenerConfig, DexScreenerSupplier};
pub use replay::ReplaySupplier;
pub use scoring::{CandidateScorer, PairMetrics, ScorerKind};
pub use sim::{SimConfig, SimSupplier};

pub type TickResult = Result<Tick, SupplierError>;

#[async_trait]
pub trait MarketDataSupplier: Send + Sync {
    /// Ranked candidates, best first.
    async fn list_candidates(&self) -> Result<Vec<Candidate>, SupplierError>;

    /// Lazy, non-restartable tick feed for one instrument.
    async fn stream_ticks(&self, id: &InstrumentId) -> Result<TickStream, SupplierError>;

    /// Point lookup of the current quote.
    async fn fetch_snapshot(&self, id: &InstrumentId) -> Result<Tick, SupplierError>;
}

/// Default channel depth between a tick producer and the controller.
pub const TICK_CHANNEL_CAPACITY: usize = 64;

pub struct TickStream {
    rx: mpsc::Receiver<TickResult>,
    producer: Option<JoinHandle<()>>,
}

impl TickStream {
    /// Spawns `produce` on the runtime with the sending half of a bounded
    /// channel. The task is aborted when the stream is dropped.
    pub fn spawn<F, Fut>(capacity: usize, produce: F) -> Self
    where
        F: FnOnce(mpsc::Sender<TickResult>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let producer = tokio::spawn(produce(tx));
        Self {
            rx,
            producer: Some(producer),
        }
    }

    /// A finite stream over pre-computed items.
    pub fn from_items(items: Vec<TickResult>) -> Self {
        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            // capacity equals the item count, so this cannot be full
            let _ = tx.try_send(item);
        }
        Self { rx, producer: None }
    }

    pub async fn recv(&mut self) -> Option<TickResult> {
        self.rx.recv().await
    }
}

impl Stream for TickStream {
    type Item = TickResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for TickStream {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SupplierKind {
    #[default]
    Sim,
    DexScreener,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplierConfig {
    pub kind: SupplierKind,
    pub dex_screener: DexScreenerConfig,
    pub sim: SimConfig,
}

pub fn build_supplier(cfg: &SupplierConfig) -> Result<Arc<dyn MarketDataSupplier>, SupplierError> {
    Ok(match cfg.kind {
        SupplierKind::Sim => Arc::new(SimSupplier::new(cfg.sim.clone())),
        SupplierKind::DexScreener => Arc::new(DexScreenerSupplier::new(cfg.dex_screener.clone())?),
    })
}
